use crate::config::{DOWNSAMPLE, SCREEN_HEIGHT, SCREEN_WIDTH};
use crate::error::InitError;
use crate::simulation::cell::{Cell, CELL_SIZE};

/// Grid dimensions in cells. Fixed once the store is allocated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridExtent {
    pub width: u32,
    pub height: u32,
    /// Screen pixels per cell, used to map pointer coordinates onto the grid
    pub downsample: u32,
}

impl GridExtent {
    /// Derive the grid from a display resolution and downsample factor
    pub fn from_display(screen_width: u32, screen_height: u32, downsample: u32) -> Self {
        Self {
            width: screen_width / downsample,
            height: screen_height / downsample,
            downsample,
        }
    }

    /// Grid for the default 1024x768 display
    pub fn default_display() -> Self {
        Self::from_display(SCREEN_WIDTH, SCREEN_HEIGHT, DOWNSAMPLE)
    }

    pub fn cell_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Size of one grid region in bytes
    pub fn byte_size(&self) -> u64 {
        (self.cell_count() * CELL_SIZE) as u64
    }

    /// Flat arena index of (x, y)
    #[cfg(test)]
    pub fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    /// Check the extent tiles exactly into `workgroup`-sized squares
    pub fn check_tiling(&self, workgroup: u32) -> Result<(), InitError> {
        if self.width == 0
            || self.height == 0
            || self.width % workgroup != 0
            || self.height % workgroup != 0
        {
            return Err(InitError::Tiling {
                width: self.width,
                height: self.height,
                workgroup,
            });
        }
        Ok(())
    }
}

/// Host-side initial contents of one grid region
pub struct Grid {
    pub cells: Vec<Cell>,
}

impl Grid {
    /// Create a grid of resting cells, each stamped with its coordinate
    pub fn new(extent: GridExtent) -> Result<Self, InitError> {
        let mut cells = Vec::new();
        cells
            .try_reserve_exact(extent.cell_count())
            .map_err(|e| InitError::Allocation {
                bytes: extent.byte_size(),
                reason: e.to_string(),
            })?;

        for y in 0..extent.height {
            for x in 0..extent.width {
                cells.push(Cell::at(x, y));
            }
        }

        Ok(Self { cells })
    }
}
