use gstreamer as gst;
use gstreamer::prelude::*;
use serde_json::json;

use crate::logging::logger;

use super::engine::{MediaEngine, MediaOptions, PlaybackError};

/// Media engine backed by a gstreamer `playbin`. One playbin is built per
/// loaded stream; dropping the handle tears the element down.
pub struct GstEngine {
    current: Option<gst::Element>,
    volume: u8,
}

pub struct GstMedia {
    element: gst::Element,
}

impl Drop for GstMedia {
    fn drop(&mut self) {
        let _ = self.element.set_state(gst::State::Null);
    }
}

impl GstEngine {
    pub fn new() -> Result<Self, PlaybackError> {
        gst::init().map_err(|error| {
            logger().error(
                "playback.engine_init_failed",
                json!({ "engine": "gstreamer", "error": format!("{:?}", error) }),
            );
            PlaybackError::Unavailable(format!("gstreamer init: {error}"))
        })?;
        logger().info("playback.engine_ready", json!({ "engine": "gstreamer" }));
        Ok(Self {
            current: None,
            volume: 100,
        })
    }

    fn apply_volume(element: &gst::Element, volume: u8) {
        element.set_property("volume", f64::from(volume) / 100.0);
    }
}

impl MediaEngine for GstEngine {
    type Media = GstMedia;

    fn create_media(
        &mut self,
        url: &str,
        options: &MediaOptions,
    ) -> Result<Self::Media, PlaybackError> {
        let buffer_ns = i64::from(options.network_caching_ms) * 1_000_000;
        let element = gst::ElementFactory::make("playbin")
            .property("uri", url)
            .property("buffer-duration", buffer_ns)
            .build()
            .map_err(|error| PlaybackError::MediaRejected(format!("build playbin: {error:?}")))?;
        Ok(GstMedia { element })
    }

    fn play(&mut self, media: &Self::Media) -> Result<(), PlaybackError> {
        Self::apply_volume(&media.element, self.volume);
        media
            .element
            .set_state(gst::State::Playing)
            .map_err(|error| PlaybackError::Engine(format!("set playing: {error}")))?;
        self.current = Some(media.element.clone());
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(element) = self.current.take() {
            let _ = element.set_state(gst::State::Null);
        }
    }

    fn is_playing(&self) -> bool {
        self.current
            .as_ref()
            .map(|element| element.current_state() == gst::State::Playing)
            .unwrap_or(false)
    }

    fn set_volume(&mut self, volume: u8) {
        self.volume = volume;
        if let Some(element) = &self.current {
            Self::apply_volume(element, volume);
        }
    }
}
