//! Common test fixtures for SST aggregation tests.
//!
//! Region boxes and ASCII region masks on the default 72x36 region grid.

use std::io::Write;

use tempfile::NamedTempFile;

/// Common region boxes in W,N,E,S order.
pub mod regions {
    /// The whole globe
    pub const GLOBAL: (f64, f64, f64, f64) = (-180.0, 90.0, 180.0, -90.0);

    /// Northern hemisphere
    pub const NORTH: (f64, f64, f64, f64) = (-180.0, 90.0, 180.0, 0.0);

    /// Southern hemisphere
    pub const SOUTH: (f64, f64, f64, f64) = (-180.0, 0.0, 180.0, -90.0);

    /// Nino 3.4 box
    pub const NINO34: (f64, f64, f64, f64) = (-170.0, 5.0, -120.0, -5.0);

    /// Crosses the antimeridian
    pub const DATELINE: (f64, f64, f64, f64) = (170.0, 10.0, -170.0, -10.0);

    /// Region list string with a global and an antimeridian region
    pub const GLOBAL_AND_DATELINE: &str = "Global=-180,90,180,-90;Dateline=170,10,-170,-10";
}

/// Default region grid width.
pub const MASK_WIDTH: usize = 72;

/// Default region grid height.
pub const MASK_HEIGHT: usize = 36;

/// Render a mask of `'0'`/`'1'` characters, one line per row.
pub fn mask_text(width: usize, height: usize, set: impl Fn(usize, usize) -> bool) -> String {
    let mut text = String::with_capacity((width + 1) * height);
    for y in 0..height {
        for x in 0..width {
            text.push(if set(x, y) { '1' } else { '0' });
        }
        text.push('\n');
    }
    text
}

pub fn global_mask_text() -> String {
    mask_text(MASK_WIDTH, MASK_HEIGHT, |_, _| true)
}

pub fn northern_hemisphere_mask_text() -> String {
    mask_text(MASK_WIDTH, MASK_HEIGHT, |_, y| y < MASK_HEIGHT / 2)
}

pub fn southern_hemisphere_mask_text() -> String {
    mask_text(MASK_WIDTH, MASK_HEIGHT, |_, y| y >= MASK_HEIGHT / 2)
}

/// Mask with a single cell set.
pub fn single_cell_mask_text(cell_x: usize, cell_y: usize) -> String {
    mask_text(MASK_WIDTH, MASK_HEIGHT, |x, y| x == cell_x && y == cell_y)
}

/// Write mask text to a temporary file that lives as long as the handle.
pub fn write_mask_file(text: &str) -> std::io::Result<NamedTempFile> {
    let mut file = NamedTempFile::new()?;
    file.write_all(text.as_bytes())?;
    file.flush()?;
    Ok(file)
}
