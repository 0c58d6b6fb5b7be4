/// Monotonic version counter used to detect stale asynchronous results.
///
/// Work captures a [`GenerationToken`] when it starts; before applying its
/// effects it checks [`Generation::is_current`]. Any later [`Generation::bump`]
/// supersedes it.
#[derive(Debug, Default, Clone)]
pub struct Generation {
    current: u64,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GenerationToken(pub u64);

impl Generation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bump(&mut self) -> GenerationToken {
        self.current = self.current.wrapping_add(1);
        GenerationToken(self.current)
    }

    pub fn token(&self) -> GenerationToken {
        GenerationToken(self.current)
    }

    pub fn is_current(&self, token: GenerationToken) -> bool {
        token.0 == self.current
    }
}
