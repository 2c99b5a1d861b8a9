//! Flow accumulation algorithm
//!
//! Counts the upstream cells draining through each cell of a D8 flow
//! direction raster (contributing area in cells).

use ndarray::Array2;
use sheed_core::raster::{d8, Raster};
use sheed_core::{Algorithm, Error, Result};

/// Flow accumulation algorithm
#[derive(Debug, Clone, Default)]
pub struct FlowAccumulation;

impl Algorithm for FlowAccumulation {
    type Input = Raster<u8>;
    type Output = Raster<f64>;
    type Params = ();
    type Error = Error;

    fn name(&self) -> &'static str {
        "Flow Accumulation"
    }

    fn description(&self) -> &'static str {
        "Calculate upstream contributing area from D8 flow direction"
    }

    fn execute(&self, input: Self::Input, _params: Self::Params) -> Result<Self::Output> {
        flow_accumulation(&input)
    }
}

/// Calculate flow accumulation from a D8 flow direction raster.
///
/// Every cell counts itself, so headwater cells have accumulation 1 and
/// every other cell holds one plus the number of cells upstream of it.
/// Processing is a topological sort from the
/// headwaters down (Kahn), so each cell is handled once.
pub fn flow_accumulation(flow_dir: &Raster<u8>) -> Result<Raster<f64>> {
    let (rows, cols) = flow_dir.shape();
    let downstream = |row: usize, col: usize| {
        let dir = unsafe { flow_dir.get_unchecked(row, col) };
        d8::step(row, col, dir, rows, cols)
    };

    let mut in_degree = Array2::<u32>::zeros((rows, cols));
    for row in 0..rows {
        for col in 0..cols {
            if let Some(target) = downstream(row, col) {
                in_degree[target] += 1;
            }
        }
    }

    let mut stack: Vec<(usize, usize)> = in_degree
        .indexed_iter()
        .filter(|(_, &n)| n == 0)
        .map(|(idx, _)| idx)
        .collect();
    let mut accumulation = Array2::<f64>::ones((rows, cols));

    while let Some((row, col)) = stack.pop() {
        let Some(target) = downstream(row, col) else {
            continue;
        };

        accumulation[target] += accumulation[(row, col)];
        in_degree[target] -= 1;
        if in_degree[target] == 0 {
            stack.push(target);
        }
    }

    let mut output = flow_dir.with_same_meta::<f64>(rows, cols);
    *output.data_mut() = accumulation;

    Ok(output)
}
