//! Text rendering of a `SurfaceState` for the `show` command.

use sandglass::config::ParticleConfig;
use sandglass::dial::MarkerKind;
use sandglass::surface::SurfaceState;

/// Rows per chamber. Row `i` of the top chamber is `2 * (ROWS - i) - 1` wide.
const ROWS: usize = 5;
const WIDTH: usize = 2 * ROWS + 1;

/// Draws the two chambers, their sand and the falling grains.
pub fn render_hourglass(state: &SurfaceState, particles: &ParticleConfig) -> Vec<String> {
    let top_rows = filled_rows(state.top_percent.unwrap_or(0.0));
    let bottom_rows = filled_rows(state.bottom_percent.unwrap_or(0.0));

    let mut grains = [[false; WIDTH]; ROWS];
    let fall = (particles.rest_y - particles.neck_y).max(f64::EPSILON);
    let half_chamber = ((particles.chamber_max_x - particles.chamber_min_x) / 2.0).max(f64::EPSILON);
    for sprite in state.particles.values() {
        let depth = ((sprite.position.y - particles.neck_y) / fall).clamp(0.0, 0.999);
        let row = (depth * ROWS as f64) as usize;
        let offset = (sprite.position.x - particles.neck_x) / half_chamber * ROWS as f64;
        let col = (ROWS as f64 + offset).round().clamp(0.0, (WIDTH - 1) as f64) as usize;
        grains[row][col] = true;
    }

    let mut lines = vec![format!("+{}+", "-".repeat(WIDTH - 2))];
    for i in 0..ROWS {
        let inner = 2 * (ROWS - i) - 1;
        let sand = i >= ROWS - top_rows;
        lines.push(chamber_row(i, inner, if sand { ':' } else { ' ' }, None, '\\', '/'));
    }
    for (i, row_grains) in grains.iter().enumerate() {
        let inner = 2 * i + 1;
        let sand = i >= ROWS - bottom_rows;
        lines.push(chamber_row(
            ROWS - 1 - i,
            inner,
            if sand { ':' } else { ' ' },
            Some(row_grains),
            '/',
            '\\',
        ));
    }
    lines.push(format!("+{}+", "-".repeat(WIDTH - 2)));
    lines
}

fn filled_rows(percent: f64) -> usize {
    ((percent.clamp(0.0, 100.0) / 100.0) * ROWS as f64).round() as usize
}

fn chamber_row(
    indent: usize,
    inner: usize,
    fill: char,
    grains: Option<&[bool; WIDTH]>,
    left: char,
    right: char,
) -> String {
    let start = (WIDTH - inner) / 2;
    let body: String = (start..start + inner)
        .map(|col| match grains {
            Some(g) if fill == ' ' && g[col] => '.',
            _ => fill,
        })
        .collect();
    format!("{}{}{}{}", " ".repeat(indent), left, body, right)
}

/// The 60-slot dial unrolled into one line, starting at the top of the dial.
///
/// `|` hour mark, `.` minute mark, `H` current hour, `M` current minute,
/// `X` both.
pub fn render_dial(state: &SurfaceState) -> String {
    state
        .markers
        .iter()
        .map(|m| match (m.hour_active, m.minute_active, m.kind) {
            (true, true, _) => 'X',
            (true, false, _) => 'H',
            (false, true, _) => 'M',
            (false, false, MarkerKind::HourMark) => '|',
            (false, false, MarkerKind::MinuteMark) => '.',
        })
        .collect()
}
