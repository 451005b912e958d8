/// Window of lines shown on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub start_line: usize,
    pub height: usize,
}

impl Viewport {
    pub fn new(start_line: usize, height: usize) -> Self {
        Self { start_line, height }
    }

    pub fn resize(&mut self, height: usize) {
        self.height = height;
    }

    /// Last visible line (exclusive)
    pub fn end_line(&self) -> usize {
        self.start_line + self.height
    }

    pub fn half_page(&self) -> usize {
        (self.height / 2).max(1)
    }

    /// Scrolls the least amount that keeps `line` at least `margin` lines
    /// away from either edge. Margins larger than half the window shrink to
    /// fit.
    pub fn scroll_to(&mut self, line: usize, margin: usize) {
        if self.height == 0 {
            self.start_line = line;
            return;
        }
        let margin = margin.min(self.height.saturating_sub(1) / 2);
        if line < self.start_line + margin {
            self.start_line = line.saturating_sub(margin);
        } else if line + margin >= self.end_line() {
            self.start_line = line + margin + 1 - self.height;
        }
    }
}
