//! Configuration validation
//!
//! Rules:
//! - field ranges declared on the config structs (`validator` derive)
//! - every topic is an absolute name
//! - stereo requires a right image topic
//! - no two subscriptions share a topic
//! - replay speed is finite and the recording path is not empty

use std::collections::HashSet;

use contracts::{ContractError, NodeConfig, TopicName};
use validator::Validate;

/// Validate a NodeConfig
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(config: &NodeConfig) -> Result<(), ContractError> {
    validate_ranges(config)?;
    validate_topic_names(config)?;
    validate_stereo_topics(config)?;
    validate_unique_topics(config)?;
    validate_replay(config)?;
    Ok(())
}

fn validate_ranges(config: &NodeConfig) -> Result<(), ContractError> {
    config
        .validate()
        .map_err(|e| ContractError::config_validation("config", e.to_string()))
}

fn subscribed_topics(config: &NodeConfig) -> Vec<(&'static str, &TopicName)> {
    let mut topics = vec![
        ("imu_topic", &config.imu_topic),
        ("image0_topic", &config.image0_topic),
        ("feature_topic", &config.feature_topic),
        ("control.restart", &config.control.restart),
        ("control.imu_switch", &config.control.imu_switch),
        ("control.cam_switch", &config.control.cam_switch),
    ];
    if let Some(image1) = &config.image1_topic {
        topics.push(("image1_topic", image1));
    }
    topics
}

fn validate_topic_names(config: &NodeConfig) -> Result<(), ContractError> {
    for (field, topic) in subscribed_topics(config) {
        if !topic.is_absolute() {
            return Err(ContractError::config_validation(
                field,
                format!("topic '{topic}' must be an absolute name"),
            ));
        }
    }
    Ok(())
}

fn validate_stereo_topics(config: &NodeConfig) -> Result<(), ContractError> {
    if config.stereo() && config.image1_topic.is_none() {
        return Err(ContractError::config_validation(
            "image1_topic",
            "num_of_cam = 2 requires image1_topic",
        ));
    }
    Ok(())
}

fn validate_unique_topics(config: &NodeConfig) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (field, topic) in subscribed_topics(config) {
        if !seen.insert(topic.as_str()) {
            return Err(ContractError::config_validation(
                field,
                format!("duplicate topic '{topic}'"),
            ));
        }
    }
    Ok(())
}

fn validate_replay(config: &NodeConfig) -> Result<(), ContractError> {
    let Some(replay) = &config.replay else {
        return Ok(());
    };

    if replay.path.as_os_str().is_empty() {
        return Err(ContractError::config_validation(
            "replay.path",
            "replay path cannot be empty",
        ));
    }

    if !replay.speed.is_finite() {
        return Err(ContractError::config_validation(
            "replay.speed",
            format!("speed must be finite, got {}", replay.speed),
        ));
    }

    replay
        .validate()
        .map_err(|e| ContractError::config_validation("replay", e.to_string()))
}
