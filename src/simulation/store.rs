use crate::error::InitError;
use crate::simulation::grid::{Grid, GridExtent};
use crate::simulation::scheduler::{BufferId, Roles};
use crate::simulation::Cell;

/// Owns the two grid regions (A and B) and their lifetime.
///
/// `R` is the backing type of one region: a host arena (`Vec<Cell>`) or a
/// device buffer. The extent is fixed at allocation; there is no resize.
pub struct GridStateStore<R> {
    extent: GridExtent,
    regions: Option<[R; 2]>,
}

impl<R> GridStateStore<R> {
    /// Allocate both regions through `alloc`, which receives the region's
    /// handle and the default-initialized grid contents
    pub fn allocate_with<F>(extent: GridExtent, mut alloc: F) -> Result<Self, InitError>
    where
        F: FnMut(BufferId, &Grid) -> Result<R, InitError>,
    {
        let initial = Grid::new(extent)?;
        let a = alloc(BufferId::A, &initial)?;
        let b = alloc(BufferId::B, &initial)?;

        Ok(Self {
            extent,
            regions: Some([a, b]),
        })
    }

    pub fn extent(&self) -> GridExtent {
        self.extent
    }

    pub fn region(&self, id: BufferId) -> Option<&R> {
        self.regions.as_ref().map(|r| &r[id.slot()])
    }

    /// Borrow the read region shared and the write region exclusively
    pub fn split(&mut self, roles: Roles) -> Option<(&R, &mut R)> {
        let [a, b] = self.regions.as_mut()?;
        match roles.read() {
            BufferId::A => Some((&*a, b)),
            BufferId::B => Some((&*b, a)),
        }
    }

    /// Drop both regions. Returns false if they were already released.
    pub fn release(&mut self) -> bool {
        match self.regions.take() {
            Some(regions) => {
                drop(regions);
                log::info!(
                    "Released grid storage ({}x{}, {} bytes per region)",
                    self.extent.width,
                    self.extent.height,
                    self.extent.byte_size()
                );
                true
            }
            None => false,
        }
    }
}

impl GridStateStore<Vec<Cell>> {
    /// Allocate two host arenas holding the default grid
    pub fn allocate(extent: GridExtent) -> Result<Self, InitError> {
        Self::allocate_with(extent, |_, initial| {
            let mut cells = Vec::new();
            cells
                .try_reserve_exact(initial.cells.len())
                .map_err(|e| InitError::Allocation {
                    bytes: extent.byte_size(),
                    reason: e.to_string(),
                })?;
            cells.extend_from_slice(&initial.cells);
            Ok(cells)
        })
    }
}
