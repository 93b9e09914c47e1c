//! Map snapshots for the operator.
//!
//! [`build`] copies the grid into a [`MapReport`]; [`render_ascii`] draws a
//! report as a wall diagram with each cell's distance printed inside it:
//!
//! ```text
//! +---+---+
//! | 1   0 |
//! +---+---+
//! ```

use microrat_types::{CellReport, MapReport, Orientation, UNREACHABLE};

use crate::grid::Grid;

/// Snapshot `grid`, top row (`y = height - 1`) first.
pub fn build(grid: &Grid) -> MapReport {
    let rows = (0..grid.height())
        .rev()
        .map(|y| {
            (0..grid.width())
                .map(|x| {
                    let cell = microrat_types::Cell::new(x as i32, y as i32);
                    CellReport {
                        x: cell.x,
                        y: cell.y,
                        walls: grid.walls_at(cell),
                        distance: grid.distance_at(cell),
                    }
                })
                .collect()
        })
        .collect();
    MapReport {
        width: grid.width(),
        height: grid.height(),
        rows,
    }
}

/// Draw `report` as ASCII art. A wall is drawn when either neighbouring cell
/// recorded it; unreachable cells are left blank.
///
/// The drawing always has `width` x `height` cells. Rows or cells missing
/// from `rows` are drawn open and blank, and extra ones are ignored.
pub fn render_ascii(report: &MapReport) -> String {
    let walls = |x: usize, y: usize| -> u8 {
        report
            .height
            .checked_sub(y + 1)
            .and_then(|row| report.rows.get(row))
            .and_then(|row| row.get(x))
            .map_or(0, |c| c.walls)
    };
    let has = |x: usize, y: usize, side: Orientation| walls(x, y) & side.bit() != 0;
    let north = |x: usize, y: usize| {
        has(x, y, Orientation::North) || (y + 1 < report.height && has(x, y + 1, Orientation::South))
    };
    let west = |x: usize, y: usize| {
        has(x, y, Orientation::West) || (x > 0 && has(x - 1, y, Orientation::East))
    };

    let mut out = String::new();
    for row in 0..report.height {
        let y = report.height - 1 - row;
        for x in 0..report.width {
            out.push('+');
            out.push_str(if north(x, y) { "---" } else { "   " });
        }
        out.push_str("+\n");

        for x in 0..report.width {
            out.push(if west(x, y) { '|' } else { ' ' });
            let distance = report
                .rows
                .get(row)
                .and_then(|cells| cells.get(x))
                .map_or(UNREACHABLE, |c| c.distance);
            if distance == UNREACHABLE {
                out.push_str("   ");
            } else {
                out.push_str(&format!("{distance:^3}"));
            }
        }
        let last = report.width.saturating_sub(1);
        out.push(if has(last, y, Orientation::East) { '|' } else { ' ' });
        out.push('\n');
    }

    for x in 0..report.width {
        out.push('+');
        out.push_str(if has(x, 0, Orientation::South) { "---" } else { "   " });
    }
    out.push_str("+\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{compute_distances, Grid};
    use microrat_types::Cell;

    fn boxed_corridor() -> Grid {
        let mut g = Grid::new(2, 1).unwrap();
        for x in 0..2 {
            let c = Cell::new(x, 0);
            g.set_wall(c, Orientation::North);
            g.set_wall(c, Orientation::South);
        }
        g.set_wall(Cell::new(0, 0), Orientation::West);
        g.set_wall(Cell::new(1, 0), Orientation::East);
        g
    }

    #[test]
    fn report_rows_start_at_the_top() {
        let mut g = Grid::new(3, 2).unwrap();
        compute_distances(&mut g, Cell::new(2, 1));
        let r = g.report();
        assert_eq!(r.rows.len(), 2);
        assert_eq!(r.rows[0][0].y, 1);
        assert_eq!(r.rows[1][0].y, 0);
        assert_eq!(r.rows[0][2].distance, 0);
        assert_eq!(r.rows[1][0].distance, 3);
    }

    #[test]
    fn report_line_format_lists_every_cell() {
        let mut g = boxed_corridor();
        compute_distances(&mut g, Cell::new(1, 0));
        let text = g.report().to_string();
        assert_eq!(text, "Labyrinth Karte:\n[0][0]:13:1,[0][1]:7:0,\n");
    }

    #[test]
    fn ascii_draws_boxed_corridor() {
        let mut g = boxed_corridor();
        compute_distances(&mut g, Cell::new(1, 0));
        let art = render_ascii(&g.report());
        assert_eq!(art, "+---+---+\n| 1   0 |\n+---+---+\n");
    }

    #[test]
    fn ascii_draws_walls_recorded_on_one_side_only() {
        let mut g = Grid::new(2, 2).unwrap();
        // Recorded from the lower cell only.
        g.set_wall(Cell::new(0, 0), Orientation::North);
        let art = render_ascii(&g.report());
        let lines: Vec<&str> = art.lines().collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(lines[2], "+---+   +");
    }

    #[test]
    fn ascii_tolerates_rows_that_do_not_match_the_size() {
        let extra = MapReport { width: 1, height: 0, rows: vec![vec![]] };
        assert_eq!(render_ascii(&extra), "+   +\n");

        let short = MapReport { width: 2, height: 1, rows: vec![] };
        assert_eq!(render_ascii(&short), format!("+   +   +\n{}\n+   +   +\n", " ".repeat(9)));
    }

    #[test]
    fn report_serializes_to_json() {
        let g = boxed_corridor();
        let json = serde_json::to_string(&g.report()).unwrap();
        assert!(json.contains("\"width\":2"));
        assert!(json.contains("\"walls\":13"));
    }
}
