//! Warmup gate: the agent sees bar `i` only once the window `[0..=i]` holds
//! `warmup_bars` bars.

#[derive(Debug, Clone)]
pub struct WarmupGate {
    required: usize,
    seen: usize,
    held_back: usize,
}

impl WarmupGate {
    pub fn new(required: usize) -> Self {
        Self {
            required,
            seen: 0,
            held_back: 0,
        }
    }

    /// Count one more bar and report whether the agent may be consulted on it.
    pub fn admit(&mut self) -> bool {
        self.seen += 1;
        let open = self.seen >= self.required;
        if !open {
            self.held_back += 1;
        }
        open
    }

    /// Bars that arrived before the gate opened (implicit HOLDs).
    pub fn held_back(&self) -> usize {
        self.held_back
    }

    /// Index of the first bar the agent will see.
    pub fn first_consulted_index(&self) -> usize {
        self.required.saturating_sub(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opens_on_the_required_bar() {
        let mut gate = WarmupGate::new(3);
        let admitted: Vec<bool> = (0..5).map(|_| gate.admit()).collect();
        assert_eq!(admitted, [false, false, true, true, true]);
        assert_eq!(gate.held_back(), 2);
        assert_eq!(gate.first_consulted_index(), 2);
    }

    #[test]
    fn zero_and_one_are_open_immediately() {
        for required in [0, 1] {
            let mut gate = WarmupGate::new(required);
            assert!(gate.admit());
            assert_eq!(gate.held_back(), 0);
            assert_eq!(gate.first_consulted_index(), 0);
        }
    }
}
