/// Current position of a stream, for anything that can seek.
pub trait Tell {
    fn tell(&mut self) -> std::io::Result<u64>;
}

impl<S: std::io::Seek> Tell for S {
    fn tell(&mut self) -> std::io::Result<u64> {
        self.stream_position()
    }
}
