//! Per-stream FIFO buffers
//!
//! A `StreamBuffer` keeps arrival order and never drops on its own;
//! retention is bounded by the subscription queue in front of it. The
//! left/right image buffers live together in
//! `StereoBuffers` behind one mutex so the synchronizer sees both fronts
//! as a single snapshot.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use contracts::ImageMessage;
use parking_lot::Mutex;

/// Message carrying a capture time in seconds
pub trait Timestamped {
    fn timestamp(&self) -> f64;
}

impl Timestamped for ImageMessage {
    #[inline]
    fn timestamp(&self) -> f64 {
        ImageMessage::timestamp(self)
    }
}

/// Camera side of a stereo rig
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
        }
    }

    pub fn camera_id(&self) -> i32 {
        match self {
            Self::Left => 0,
            Self::Right => 1,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unbounded FIFO of one message type
pub struct StreamBuffer<T> {
    queue: VecDeque<T>,
    high_water: usize,
    out_of_order_count: u64,
    last_timestamp: Option<f64>,
}

impl<T> fmt::Debug for StreamBuffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamBuffer")
            .field("len", &self.queue.len())
            .field("high_water", &self.high_water)
            .field("out_of_order", &self.out_of_order_count)
            .finish()
    }
}

impl<T> Default for StreamBuffer<T> {
    fn default() -> Self {
        Self {
            queue: VecDeque::new(),
            high_water: 0,
            out_of_order_count: 0,
            last_timestamp: None,
        }
    }
}

impl<T: Timestamped> StreamBuffer<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `msg` at the tail
    ///
    /// Stamps going backwards are counted, never reordered.
    #[inline]
    pub fn push(&mut self, msg: T) {
        let timestamp = msg.timestamp();
        if let Some(last) = self.last_timestamp {
            if timestamp < last {
                self.out_of_order_count += 1;
            }
        }
        self.last_timestamp = Some(timestamp);

        self.queue.push_back(msg);
        self.high_water = self.high_water.max(self.queue.len());
    }

    /// Oldest message, if any
    #[inline]
    pub fn peek_front(&self) -> Option<&T> {
        self.queue.front()
    }

    /// Stamp of the oldest message, if any
    #[inline]
    pub fn front_timestamp(&self) -> Option<f64> {
        self.peek_front().map(Timestamped::timestamp)
    }

    /// Remove and return the oldest message
    #[inline]
    pub fn pop_front(&mut self) -> Option<T> {
        self.queue.pop_front()
    }
}

impl<T> StreamBuffer<T> {
    #[inline]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Drop every buffered message; counters are kept
    pub fn clear(&mut self) {
        self.queue.clear();
    }

    /// Largest depth seen so far
    pub fn high_water(&self) -> usize {
        self.high_water
    }

    /// Pushes whose stamp was older than the previous push
    pub fn out_of_order_count(&self) -> u64 {
        self.out_of_order_count
    }
}

/// Left and right image buffers, always locked together
#[derive(Debug, Default)]
pub struct StereoBuffers {
    pub left: StreamBuffer<ImageMessage>,
    pub right: StreamBuffer<ImageMessage>,
}

/// Buffer pair shared by the image handlers and the synchronizer
pub type SharedStereoBuffers = Arc<Mutex<StereoBuffers>>;

impl StereoBuffers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedStereoBuffers {
        Arc::new(Mutex::new(Self::new()))
    }

    pub fn side(&self, side: Side) -> &StreamBuffer<ImageMessage> {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }

    pub fn side_mut(&mut self, side: Side) -> &mut StreamBuffer<ImageMessage> {
        match side {
            Side::Left => &mut self.left,
            Side::Right => &mut self.right,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use contracts::Stamp;
    use rand::Rng;

    #[derive(Debug, Clone, Copy, PartialEq)]
    struct Sample(f64);

    impl Timestamped for Sample {
        fn timestamp(&self) -> f64 {
            self.0
        }
    }

    fn image(t: f64) -> ImageMessage {
        ImageMessage {
            stamp: Stamp::from_sec(t),
            height: 1,
            width: 1,
            encoding: "mono8".to_string(),
            is_bigendian: false,
            step: 1,
            data: Bytes::from_static(&[0]),
        }
    }

    #[test]
    fn test_empty_buffer() {
        let mut buffer = StreamBuffer::<Sample>::new();
        assert!(buffer.is_empty());
        assert!(buffer.peek_front().is_none());
        assert!(buffer.front_timestamp().is_none());
        assert!(buffer.pop_front().is_none());
    }

    #[test]
    fn test_peek_does_not_remove() {
        let mut buffer = StreamBuffer::new();
        buffer.push(Sample(1.0));
        buffer.push(Sample(2.0));

        assert_eq!(buffer.peek_front(), Some(&Sample(1.0)));
        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.pop_front(), Some(Sample(1.0)));
        assert_eq!(buffer.front_timestamp(), Some(2.0));
    }

    #[test]
    fn test_fifo_order_randomized() {
        let mut rng = rand::rng();
        let mut buffer = StreamBuffer::new();
        let mut expected = std::collections::VecDeque::new();
        let mut next = 0.0;

        for _ in 0..5000 {
            if rng.random_bool(0.6) {
                next += 1.0;
                buffer.push(Sample(next));
                expected.push_back(Sample(next));
            } else {
                assert_eq!(buffer.pop_front(), expected.pop_front());
            }
        }
        while let Some(sample) = expected.pop_front() {
            assert_eq!(buffer.pop_front(), Some(sample));
        }
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_push_never_drops() {
        let mut buffer = StreamBuffer::new();
        for t in 0..500 {
            buffer.push(Sample(t as f64));
        }

        assert_eq!(buffer.len(), 500);
        assert_eq!(buffer.high_water(), 500);
        for t in 0..500 {
            assert_eq!(buffer.pop_front(), Some(Sample(t as f64)));
        }
        assert_eq!(buffer.high_water(), 500);
    }

    #[test]
    fn test_out_of_order_counted_not_reordered() {
        let mut buffer = StreamBuffer::new();
        buffer.push(Sample(2.0));
        buffer.push(Sample(1.0));
        buffer.push(Sample(3.0));

        assert_eq!(buffer.out_of_order_count(), 1);
        assert_eq!(buffer.pop_front(), Some(Sample(2.0)));
        assert_eq!(buffer.pop_front(), Some(Sample(1.0)));
    }

    #[test]
    fn test_clear_keeps_counters() {
        let mut buffer = StreamBuffer::new();
        buffer.push(Sample(2.0));
        buffer.push(Sample(1.0));
        buffer.clear();

        assert!(buffer.is_empty());
        assert_eq!(buffer.high_water(), 2);
        assert_eq!(buffer.out_of_order_count(), 1);
    }

    #[test]
    fn test_stereo_buffers_sides() {
        let buffers = StereoBuffers::shared();
        {
            let mut guard = buffers.lock();
            guard.side_mut(Side::Left).push(image(100.0));
            guard.side_mut(Side::Right).push(image(100.002));
        }

        let guard = buffers.lock();
        assert_eq!(guard.left.len(), 1);
        assert_eq!(guard.right.len(), 1);
        let t1 = guard.side(Side::Right).front_timestamp().unwrap();
        assert!((t1 - 100.002).abs() < 1e-9);
    }
}
