/// Hands out the ids of orders and executions for one broker instance.
///
/// Ids start at 1 and only grow. Each `Broker` owns its own sequence, so two
/// engines in the same process never share an id space.
#[derive(Debug, Clone)]
pub struct IdSequence {
    next: u64,
}

impl IdSequence {
    pub fn new() -> Self {
        Self { next: 1 }
    }

    pub fn next_id(&mut self) -> String {
        let id = self.next;
        self.next += 1;
        id.to_string()
    }
}

impl Default for IdSequence {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequences_are_independent() {
        let mut a = IdSequence::new();
        let mut b = IdSequence::new();
        assert_eq!(a.next_id(), "1");
        assert_eq!(a.next_id(), "2");
        assert_eq!(b.next_id(), "1");
    }
}
