//! Pixel drawing helpers used by the `@line` macro.
use super::ast::Keyword;
use super::lexer::Token;

/// Screen registers of the display device.
const SCREEN_X: i64 = 64;
const SCREEN_Y: i64 = 65;
const SCREEN_CTRL: i64 = 66;

const CTRL_DRAW: i64 = 3;
const CTRL_CLEAR: i64 = 0;

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Point {
    pub x: i64,
    pub y: i64,
}

impl Point {
    pub fn new(x: i64, y: i64) -> Self {
        Point { x, y }
    }
}

/// Rasterizes the segment `a`-`b` with a DDA, endpoints included.
pub fn rasterize(a: Point, b: Point) -> Vec<Point> {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let steps = dx.abs().max(dy.abs());

    if steps == 0 {
        return vec![a];
    }

    let x_incr = dx as f64 / steps as f64;
    let y_incr = dy as f64 / steps as f64;
    let (mut x, mut y) = (a.x as f64, a.y as f64);
    let mut points = Vec::with_capacity(steps as usize + 1);

    for _ in 0..=steps {
        points.push(Point::new(round_half_up(x), round_half_up(y)));
        x += x_incr;
        y += y_incr;
    }

    points
}

// Halves round toward positive infinity.
fn round_half_up(v: f64) -> i64 {
    (v + 0.5).floor() as i64
}

/// Token sequence that plots one pixel: latch both coordinates, then
/// pulse the control register with draw followed by clear.
pub fn pixel_tokens(p: Point) -> Vec<Token> {
    let mut tokens = Vec::with_capacity(24);
    for (port, value) in [
        (SCREEN_X, p.x),
        (SCREEN_Y, p.y),
        (SCREEN_CTRL, CTRL_DRAW),
        (SCREEN_CTRL, CTRL_CLEAR),
    ]
    .iter()
    {
        tokens.extend(store_through_r0(*port, *value));
    }
    tokens
}

/// `LD :0 value` followed by `LD #port :0`.
pub fn store_through_r0(port: i64, value: i64) -> Vec<Token> {
    vec![
        Token::Kwd(Keyword::LD),
        Token::Reg(0),
        Token::Int(value),
        Token::Kwd(Keyword::LD),
        Token::Mem(port),
        Token::Reg(0),
    ]
}

/// Tokens that draw every pixel of the segment `a`-`b`.
pub fn line_tokens(a: Point, b: Point) -> Vec<Token> {
    let points = rasterize(a, b);
    debug!("line {:?} -> {:?} rasterized to {} points", a, b, points.len());
    points.into_iter().flat_map(pixel_tokens).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pts(v: &[(i64, i64)]) -> Vec<Point> {
        v.iter().map(|&(x, y)| Point::new(x, y)).collect()
    }

    #[test]
    fn test_rasterize_axis_aligned() {
        assert_eq!(
            rasterize(Point::new(0, 0), Point::new(3, 0)),
            pts(&[(0, 0), (1, 0), (2, 0), (3, 0)])
        );
        assert_eq!(
            rasterize(Point::new(2, 5), Point::new(2, 3)),
            pts(&[(2, 5), (2, 4), (2, 3)])
        );
    }

    #[test]
    fn test_rasterize_shallow_slope() {
        assert_eq!(
            rasterize(Point::new(0, 0), Point::new(4, 2)),
            pts(&[(0, 0), (1, 1), (2, 1), (3, 2), (4, 2)])
        );
    }

    #[test]
    fn test_rasterize_single_point() {
        assert_eq!(rasterize(Point::new(7, 7), Point::new(7, 7)), pts(&[(7, 7)]));
    }

    #[test]
    fn test_pixel_tokens() {
        let toks = pixel_tokens(Point::new(5, 9));
        assert_eq!(toks.len(), 24);
        assert_eq!(&toks[0..6], &store_through_r0(64, 5)[..]);
        assert_eq!(&toks[6..12], &store_through_r0(65, 9)[..]);
        assert_eq!(&toks[12..18], &store_through_r0(66, 3)[..]);
        assert_eq!(&toks[18..24], &store_through_r0(66, 0)[..]);
    }

    #[test]
    fn test_line_tokens() {
        assert_eq!(line_tokens(Point::new(0, 0), Point::new(2, 2)).len(), 3 * 24);
    }
}
