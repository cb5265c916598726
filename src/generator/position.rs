//! Cursor tracking and POSITION formatting
//!
//! VIPP keeps an absolute cursor in millimetres. DocDEF positions are either
//! keywords relative to the previous output (`SAME`, `NEXT`, ...) or margin
//! corrected absolute values. The [`Cursor`] decides which form each axis
//! takes for the next output.

/// Format a number the way the calibrated output expects: always with a
/// fractional part (`24.0`, `49.91`).
pub fn py_float(value: f64) -> String {
    format!("{:?}", value)
}

/// One axis of a POSITION clause
#[derive(Debug, Clone, PartialEq)]
pub enum Coord {
    /// Absolute millimetres, margin corrected on output
    Value(f64),
    /// Relative keyword or expression (`SAME`, `NEXT-($LINESP*#3)`, `LEFT-$MR_LEFT`)
    Keyword(String),
}

impl Coord {
    pub fn keyword(text: &str) -> Self {
        Coord::Keyword(text.to_string())
    }

    /// Horizontal clause text.
    pub fn x_clause(&self) -> String {
        match self {
            Coord::Value(v) => format!("({} MM-$MR_LEFT)", py_float(*v)),
            Coord::Keyword(k) => format!("({})", k),
        }
    }

    /// Vertical clause text; `correction` applies to absolute values only.
    pub fn y_clause(&self, correction: Option<&str>) -> String {
        match (self, correction) {
            (Coord::Value(v), Some(c)) => format!("({} MM-$MR_TOP+{})", py_float(*v), c),
            (Coord::Value(v), None) => format!("({} MM-$MR_TOP)", py_float(*v)),
            (Coord::Keyword(k), _) => format!("({})", k),
        }
    }
}

/// `POSITION x y` with an optional font correction variable.
pub fn position(x: &Coord, y: &Coord, correction: Option<&str>) -> String {
    format!("POSITION {} {}", x.x_clause(), y.y_clause(correction))
}

/// How the vertical axis is resolved for the next output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vertical {
    /// Set by MOVETO
    Explicit,
    /// Unchanged line (after MOVEH, or at section start)
    Same,
    /// Advance one line
    Next,
    /// Below the last TEXT block
    AfterText,
    /// Advance one line, then back up by `n - 1` line units (negative NL)
    Back(u32),
}

/// Section-local cursor state
#[derive(Debug, Clone, PartialEq)]
pub struct Cursor {
    pub x: f64,
    pub y: f64,
    x_set: bool,
    vertical: Vertical,
}

impl Cursor {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y, x_set: false, vertical: Vertical::Same }
    }

    pub fn vertical(&self) -> Vertical {
        self.vertical
    }

    pub fn x_is_set(&self) -> bool {
        self.x_set
    }

    pub fn y_is_set(&self) -> bool {
        self.vertical == Vertical::Explicit
    }

    /// `x y MOVETO`
    pub fn move_to(&mut self, x: f64, y: f64) {
        self.x = x;
        self.y = y;
        self.x_set = true;
        self.vertical = Vertical::Explicit;
    }

    /// `x MOVEH`: the line stays where it is.
    pub fn move_horizontal(&mut self, x: f64) {
        self.x = x;
        self.x_set = true;
        self.vertical = Vertical::Same;
    }

    /// After a text-emitting statement; `block` is true for TEXT BASELINE.
    pub fn after_output(&mut self, block: bool) {
        self.x_set = false;
        self.vertical = if block { Vertical::AfterText } else { Vertical::Next };
    }

    /// After an explicit empty line.
    pub fn after_new_line(&mut self) {
        self.vertical = Vertical::Next;
    }

    /// Negative NL: fold `lines` back into the next vertical position.
    pub fn back_up(&mut self, lines: u32) {
        self.vertical = Vertical::Back(lines);
    }

    /// After a segment call both axes become implicit.
    pub fn release(&mut self) {
        self.x_set = false;
        if self.vertical == Vertical::Explicit {
            self.vertical = Vertical::Same;
        }
    }

    pub fn x_coord(&self) -> Coord {
        if self.x_set {
            Coord::Value(self.x)
        } else {
            Coord::keyword("SAME")
        }
    }

    pub fn y_coord(&self) -> Coord {
        match self.vertical {
            Vertical::Explicit => Coord::Value(self.y),
            Vertical::Same => Coord::keyword("SAME"),
            Vertical::Next | Vertical::Back(0) | Vertical::Back(1) => Coord::keyword("NEXT"),
            Vertical::AfterText => Coord::keyword("LASTMAX+6 MM"),
            Vertical::Back(n) => Coord::Keyword(format!("NEXT-($LINESP*#{})", n - 1)),
        }
    }
}
