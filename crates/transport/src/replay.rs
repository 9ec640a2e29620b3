//! Replay source - publishes a recorded message stream onto the bus
//!
//! A recording is a JSON Lines file, one message per line, in capture
//! order:
//!
//! ```text
//! {"kind":"imu","topic":"/imu0","message":{"stamp":{"sec":1,"nanosec":0},...}}
//! {"kind":"image","topic":"/cam0/image_raw","message":{"stamp":...,"data_file":"cam0/1.raw",...}}
//! ```
//!
//! Image pixels are either inline (`data`) or in a side file (`data_file`)
//! relative to the recording.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::time::Duration;

use bytes::Bytes;
use contracts::{
    BoolMessage, ImageMessage, ImuMessage, PointCloudMessage, ReplayConfig, Stamp, TopicName,
};
use serde::Deserialize;
use tokio::time::Instant;
use tracing::{debug, info, instrument};

use crate::bus::Bus;
use crate::error::{Result, TransportError};

/// One line of a recording
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReplayRecord {
    Image {
        topic: TopicName,
        message: RecordedImage,
    },
    Imu {
        topic: TopicName,
        message: ImuMessage,
    },
    Features {
        topic: TopicName,
        message: PointCloudMessage,
    },
    Bool {
        topic: TopicName,
        message: BoolMessage,
    },
}

/// Recorded image, pixels inline or in a side file
#[derive(Debug, Clone, Deserialize)]
pub struct RecordedImage {
    pub stamp: Stamp,
    pub height: u32,
    pub width: u32,
    pub encoding: String,
    #[serde(default)]
    pub is_bigendian: bool,
    #[serde(default)]
    pub step: Option<u32>,
    #[serde(default, with = "serde_bytes")]
    pub data: Option<Vec<u8>>,
    #[serde(default)]
    pub data_file: Option<PathBuf>,
}

/// A loaded message ready to publish
#[derive(Debug, Clone)]
pub enum ReplayMessage {
    Image(ImageMessage),
    Imu(ImuMessage),
    Features(PointCloudMessage),
    Bool(BoolMessage),
}

impl ReplayMessage {
    /// Capture stamp; control signals carry none
    pub fn stamp(&self) -> Option<Stamp> {
        match self {
            Self::Image(msg) => Some(msg.stamp),
            Self::Imu(msg) => Some(msg.stamp),
            Self::Features(msg) => Some(msg.stamp),
            Self::Bool(_) => None,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Image(_) => "image",
            Self::Imu(_) => "imu",
            Self::Features(_) => "features",
            Self::Bool(_) => "bool",
        }
    }
}

/// Replay run summary
#[derive(Debug, Clone, Default)]
pub struct ReplayStats {
    pub images: u64,
    pub imu: u64,
    pub features: u64,
    pub controls: u64,
    pub passes: u64,
}

impl ReplayStats {
    pub fn total(&self) -> u64 {
        self.images + self.imu + self.features + self.controls
    }

    fn count(&mut self, message: &ReplayMessage) {
        match message {
            ReplayMessage::Image(_) => self.images += 1,
            ReplayMessage::Imu(_) => self.imu += 1,
            ReplayMessage::Features(_) => self.features += 1,
            ReplayMessage::Bool(_) => self.controls += 1,
        }
    }
}

/// Recorded message stream
pub struct ReplaySource {
    messages: Vec<(TopicName, ReplayMessage)>,
    speed: f64,
    loop_playback: bool,
}

impl ReplaySource {
    /// Load a recording described by `config`
    pub fn load(config: &ReplayConfig) -> Result<Self> {
        let messages = Self::read_recording(&config.path)?;
        info!(
            path = %config.path.display(),
            messages = messages.len(),
            "loaded recording"
        );
        Ok(Self {
            messages,
            speed: config.speed,
            loop_playback: config.loop_playback,
        })
    }

    /// Build a source from already-loaded messages
    pub fn from_messages(messages: Vec<(TopicName, ReplayMessage)>, speed: f64) -> Self {
        Self {
            messages,
            speed,
            loop_playback: false,
        }
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Publish every message in recording order
    ///
    /// Pacing follows the recorded stamps divided by the speed multiplier;
    /// speed 0 publishes as fast as possible. Loops forever when looping is
    /// enabled, so callers race it against their own shutdown signal.
    #[instrument(name = "replay_play", skip(self, bus), fields(messages = self.messages.len()))]
    pub async fn play(&self, bus: &Bus) -> Result<ReplayStats> {
        let mut stats = ReplayStats::default();

        loop {
            self.play_once(bus, &mut stats).await?;
            stats.passes += 1;

            if !self.loop_playback || self.messages.is_empty() {
                break;
            }
            debug!(passes = stats.passes, "looping replay");
        }

        info!(published = stats.total(), passes = stats.passes, "replay completed");
        Ok(stats)
    }

    async fn play_once(&self, bus: &Bus, stats: &mut ReplayStats) -> Result<()> {
        let start = Instant::now();
        let mut first_stamp: Option<f64> = None;

        for (topic, message) in &self.messages {
            if let (Some(stamp), true) = (message.stamp(), self.speed > 0.0) {
                let t = stamp.to_sec();
                let t0 = *first_stamp.get_or_insert(t);
                let offset = ((t - t0) / self.speed).max(0.0);
                tokio::time::sleep_until(start + Duration::from_secs_f64(offset)).await;
            }

            let delivered = Self::publish(bus, topic, message)?;
            stats.count(message);
            if delivered == 0 {
                debug!(topic = %topic, kind = message.kind(), "no subscriber for recorded topic");
            }
        }
        Ok(())
    }

    fn publish(bus: &Bus, topic: &TopicName, message: &ReplayMessage) -> Result<usize> {
        match message {
            ReplayMessage::Image(msg) => bus.publish(topic, msg.clone()),
            ReplayMessage::Imu(msg) => bus.publish(topic, *msg),
            ReplayMessage::Features(msg) => bus.publish(topic, msg.clone()),
            ReplayMessage::Bool(msg) => bus.publish(topic, *msg),
        }
    }

    fn read_recording(path: &Path) -> Result<Vec<(TopicName, ReplayMessage)>> {
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        let reader = BufReader::new(File::open(path)?);
        let mut messages = Vec::new();

        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            let record: ReplayRecord =
                serde_json::from_str(&line).map_err(|e| TransportError::ReplayParse {
                    line: idx + 1,
                    message: e.to_string(),
                })?;
            messages.push(Self::resolve(record, base, idx + 1)?);
        }

        Ok(messages)
    }

    fn resolve(record: ReplayRecord, base: &Path, line: usize) -> Result<(TopicName, ReplayMessage)> {
        Ok(match record {
            ReplayRecord::Image { topic, message } => {
                let image = Self::build_image(message, base, line)?;
                (topic, ReplayMessage::Image(image))
            }
            ReplayRecord::Imu { topic, message } => (topic, ReplayMessage::Imu(message)),
            ReplayRecord::Features { topic, message } => (topic, ReplayMessage::Features(message)),
            ReplayRecord::Bool { topic, message } => (topic, ReplayMessage::Bool(message)),
        })
    }

    fn build_image(record: RecordedImage, base: &Path, line: usize) -> Result<ImageMessage> {
        let data = match (record.data, record.data_file) {
            (Some(data), _) => Bytes::from(data),
            (None, Some(file)) => Bytes::from(std::fs::read(base.join(file))?),
            (None, None) => {
                return Err(TransportError::ReplayParse {
                    line,
                    message: "image record needs `data` or `data_file`".to_string(),
                })
            }
        };

        let step = match record.step {
            Some(step) => step,
            None if record.height > 0 => (data.len() as u32) / record.height,
            None => 0,
        };

        Ok(ImageMessage {
            stamp: record.stamp,
            height: record.height,
            width: record.width,
            encoding: record.encoding,
            is_bigendian: record.is_bigendian,
            step,
            data,
        })
    }
}
