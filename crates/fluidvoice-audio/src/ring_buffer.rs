//! Lock-free single-producer/single-consumer ring buffer for captured PCM.
//!
//! Overflow policy: drop the oldest samples and mark the buffer truncated,
//! rather than blocking the audio callback or losing the newest audio.

use rtrb::RingBuffer;

pub struct AudioRingBuffer {
    producer: rtrb::Producer<i16>,
    consumer: rtrb::Consumer<i16>,
}

impl AudioRingBuffer {
    pub fn new(capacity: usize) -> Self {
        let (producer, consumer) = RingBuffer::new(capacity);
        Self { producer, consumer }
    }

    pub fn split(self) -> (AudioProducer, AudioConsumer) {
        (
            AudioProducer {
                producer: self.producer,
            },
            AudioConsumer {
                consumer: self.consumer,
            },
        )
    }
}

pub struct AudioProducer {
    producer: rtrb::Producer<i16>,
}

impl AudioProducer {
    /// Writes samples into the buffer. If the buffer does not have room for
    /// the whole batch, the oldest samples *in this batch* are dropped so
    /// the newest audio is always preserved; returns `true` when that
    /// happened so the caller can mark the in-progress recording truncated.
    pub fn write(&mut self, samples: &[i16]) -> bool {
        let available = self.producer.slots();
        let (to_write, truncated) = if samples.len() > available {
            (&samples[samples.len() - available..], true)
        } else {
            (samples, false)
        };
        if to_write.is_empty() {
            return truncated;
        }
        if let Ok(mut chunk) = self.producer.write_chunk(to_write.len()) {
            let (first, second) = chunk.as_mut_slices();
            let split = first.len();
            first.copy_from_slice(&to_write[..split]);
            if !second.is_empty() {
                second.copy_from_slice(&to_write[split..]);
            }
            chunk.commit_all();
        }
        truncated
    }

    pub fn slots(&self) -> usize {
        self.producer.slots()
    }
}

pub struct AudioConsumer {
    consumer: rtrb::Consumer<i16>,
}

impl AudioConsumer {
    pub fn read(&mut self, buffer: &mut [i16]) -> usize {
        let available = self.consumer.slots().min(buffer.len());
        if available == 0 {
            return 0;
        }
        let chunk = match self.consumer.read_chunk(available) {
            Ok(chunk) => chunk,
            Err(_) => return 0,
        };
        let len = chunk.len();
        let (first, second) = chunk.as_slices();
        let split = first.len();
        buffer[..split].copy_from_slice(first);
        if !second.is_empty() {
            buffer[split..split + second.len()].copy_from_slice(second);
        }
        chunk.commit_all();
        len
    }

    pub fn slots(&self) -> usize {
        self.consumer.slots()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read_round_trips() {
        let rb = AudioRingBuffer::new(1024);
        let (mut producer, mut consumer) = rb.split();
        let samples = vec![1i16, 2, 3, 4, 5];
        assert!(!producer.write(&samples));
        let mut out = vec![0i16; 10];
        let n = consumer.read(&mut out);
        assert_eq!(n, 5);
        assert_eq!(&out[..5], &samples[..]);
    }

    #[test]
    fn overflow_drops_oldest_and_marks_truncated() {
        let rb = AudioRingBuffer::new(8);
        let (mut producer, mut consumer) = rb.split();
        let samples: Vec<i16> = (0..16).collect();
        let truncated = producer.write(&samples);
        assert!(truncated);
        let mut out = vec![0i16; 8];
        let n = consumer.read(&mut out);
        assert_eq!(n, 8);
        // only the newest 8 samples survive
        assert_eq!(&out[..8], &samples[8..]);
    }
}
