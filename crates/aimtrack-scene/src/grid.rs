use aimtrack_input::viewport::PlotRect;

/// Grid line positions for a plot, in canvas pixels.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GridLines {
    /// `y` of each horizontal line.
    pub horizontal: Vec<f64>,
    /// `x` of each vertical line.
    pub vertical: Vec<f64>,
    /// The two centre axes `(x, y)`, drawn heavier.
    pub axes: (f64, f64),
}

/// Lines from the plot centre outward every `square_size` pixels, both ways,
/// staying inside the plot. Each position appears once, sorted ascending.
pub fn grid_lines(rect: &PlotRect, square_size: f64) -> GridLines {
    let centre = rect.centre();
    let mut lines = GridLines {
        axes: (centre.x, centre.y),
        ..GridLines::default()
    };
    if square_size.is_nan() || square_size <= 0.0 {
        return lines;
    }

    lines.horizontal = outward(centre.y, rect.y, rect.y + rect.h, square_size);
    lines.vertical = outward(centre.x, rect.x, rect.x + rect.w, square_size);
    lines
}

fn outward(centre: f64, low: f64, high: f64, step: f64) -> Vec<f64> {
    let below = (1..)
        .map(|k| centre - k as f64 * step)
        .take_while(|&p| p >= low);
    let above = (1..)
        .map(|k| centre + k as f64 * step)
        .take_while(|&p| p <= high);

    let mut positions: Vec<f64> = below.collect();
    positions.reverse();
    positions.push(centre);
    positions.extend(above);
    positions
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_step_out_from_the_centre() {
        let rect = PlotRect::new(0.0, 0.0, 100.0, 60.0);
        let grid = grid_lines(&rect, 20.0);
        assert_eq!(grid.axes, (50.0, 30.0));
        assert_eq!(grid.vertical, vec![10.0, 30.0, 50.0, 70.0, 90.0]);
        assert_eq!(grid.horizontal, vec![10.0, 30.0, 50.0]);
    }

    #[test]
    fn edge_lines_are_inclusive() {
        let rect = PlotRect::new(10.0, 10.0, 40.0, 40.0);
        let grid = grid_lines(&rect, 10.0);
        assert_eq!(grid.vertical, vec![10.0, 20.0, 30.0, 40.0, 50.0]);
    }

    #[test]
    fn non_positive_square_gives_axes_only() {
        let rect = PlotRect::new(0.0, 0.0, 100.0, 60.0);
        let grid = grid_lines(&rect, 0.0);
        assert!(grid.horizontal.is_empty() && grid.vertical.is_empty());
        assert_eq!(grid.axes, (50.0, 30.0));
    }
}
