use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pos {
    pub filename: String,
    pub line: usize,
    pub col: usize,
}

impl Pos {
    pub fn advance(&mut self) {
        self.col += 1;
    }

    // tab stops every 8 columns
    pub fn advance_to_tabstop(&mut self) {
        while self.col % 8 != 0 {
            self.advance();
        }
    }

    pub fn advance_to_newline(&mut self) {
        self.col = 0;
        self.line += 1;
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}:{}", self.filename, self.line, self.col)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(line: usize, col: usize) -> Pos {
        Pos {
            filename: "test".to_string(),
            line,
            col,
        }
    }

    #[test]
    fn advance_moves_one_column() {
        let mut p = pos(1, 0);
        p.advance();
        assert_eq!(p, pos(1, 1));
    }

    #[test]
    fn tabstop_lands_on_multiple_of_eight() {
        let mut p = pos(1, 2);
        p.advance_to_tabstop();
        assert_eq!(p, pos(1, 8));

        let mut p = pos(1, 8);
        p.advance_to_tabstop();
        assert_eq!(p, pos(1, 8));

        let mut p = pos(3, 15);
        p.advance_to_tabstop();
        assert_eq!(p, pos(3, 16));
    }

    #[test]
    fn newline_resets_column() {
        let mut p = pos(2, 17);
        p.advance_to_newline();
        assert_eq!(p, pos(3, 0));
    }

    #[test]
    fn display_includes_filename() {
        assert_eq!(pos(4, 7).to_string(), "test:4:7");
    }
}
