//! Edge-cell validation of carved masks.

use landforge_core::GridBuffer;

/// Counts the cells of carved regions that reach the grid border.
///
/// A cell is carved when its value is above zero. Carved cells are grouped
/// into 4-connected regions; regions whose size lies in `[min_size, max_size]`
/// contribute their cells to the count. With `edge_only`, only regions that
/// touch the outer border contribute.
#[must_use]
pub fn count_edge_cells(grid: &GridBuffer<f64>, min_size: usize, max_size: usize, edge_only: bool) -> usize {
    let (width, height) = (grid.width(), grid.height());
    let mut visited = vec![false; width * height];
    let mut stack = Vec::new();
    let mut total = 0;

    for start_z in 0..height {
        for start_x in 0..width {
            let start = start_z * width + start_x;
            if visited[start] || *grid.get(start_x, start_z) <= 0.0 {
                continue;
            }

            visited[start] = true;
            stack.push((start_x, start_z));
            let mut size = 0;
            let mut touches_edge = false;

            while let Some((x, z)) = stack.pop() {
                size += 1;
                if x == 0 || z == 0 || x + 1 == width || z + 1 == height {
                    touches_edge = true;
                }
                for (nx, nz) in neighbours(x, z, width, height) {
                    let index = nz * width + nx;
                    if !visited[index] && *grid.get(nx, nz) > 0.0 {
                        visited[index] = true;
                        stack.push((nx, nz));
                    }
                }
            }

            if (min_size..=max_size).contains(&size) && (touches_edge || !edge_only) {
                total += size;
            }
        }
    }

    total
}

/// In-bounds 4-neighbours of `(x, z)`.
pub(crate) fn neighbours(x: usize, z: usize, width: usize, height: usize) -> impl Iterator<Item = (usize, usize)> {
    let left = x.checked_sub(1).map(|nx| (nx, z));
    let right = (x + 1 < width).then_some((x + 1, z));
    let up = z.checked_sub(1).map(|nz| (x, nz));
    let down = (z + 1 < height).then_some((x, z + 1));
    [left, right, up, down].into_iter().flatten()
}
