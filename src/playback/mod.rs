mod engine;
#[cfg(feature = "gstreamer")]
mod gst;

pub use engine::{MediaEngine, MediaOptions, PlaybackError};
#[cfg(feature = "gstreamer")]
pub use gst::GstEngine;

use serde::Serialize;
use serde_json::json;

use crate::config::PlaybackConfig;
use crate::logging::logger;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Idle,
    Playing,
    Stopped,
    Error,
}

/// Owns one media engine and at most one loaded stream. All engine failures
/// are absorbed here: the session logs, parks itself in `Error`, and stays
/// usable for the next `play`.
pub struct PlaybackSession<E: MediaEngine> {
    engine: E,
    current: Option<E::Media>,
    volume: u8,
    state: SessionState,
    options: MediaOptions,
    closed: bool,
}

impl<E: MediaEngine> PlaybackSession<E> {
    pub fn new(engine: E, config: &PlaybackConfig) -> Self {
        Self {
            engine,
            current: None,
            volume: config.default_volume.min(100),
            state: SessionState::Idle,
            options: MediaOptions {
                network_caching_ms: config.network_caching_ms,
            },
            closed: false,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The sticky volume, kept across stop/play cycles.
    pub fn volume(&self) -> u8 {
        self.volume
    }

    /// Loads `url` and starts playback, stopping the active stream first so
    /// at most one stream is live at any instant. Returns whether playback
    /// started.
    pub fn play(&mut self, url: &str) -> bool {
        if self.state == SessionState::Playing {
            self.engine.stop();
        }
        // The previous media is released no matter how the load turns out.
        self.current = None;

        match self.load_and_start(url) {
            Ok(media) => {
                self.current = Some(media);
                self.state = SessionState::Playing;
                logger().info(
                    "playback.started",
                    json!({ "url": url, "volume": self.volume }),
                );
                true
            }
            Err(error) => {
                self.state = SessionState::Error;
                logger().error(
                    "playback.failed",
                    json!({ "url": url, "error": error.to_string() }),
                );
                false
            }
        }
    }

    fn load_and_start(&mut self, url: &str) -> Result<E::Media, PlaybackError> {
        let media = self.engine.create_media(url, &self.options)?;
        self.engine.set_volume(self.volume);
        self.engine.play(&media)?;
        Ok(media)
    }

    /// Accepts volumes in 0..=100; anything else is silently ignored and
    /// the sticky value keeps its prior setting.
    pub fn set_volume(&mut self, volume: i32) {
        if !(0..=100).contains(&volume) {
            return;
        }
        self.volume = volume as u8;
        self.engine.set_volume(self.volume);
    }

    /// Stops the active stream. Idempotent: repeated calls, or a stop with
    /// nothing playing, settle on `Stopped` without touching the engine.
    pub fn stop(&mut self) {
        if self.state == SessionState::Playing {
            self.engine.stop();
            logger().info("playback.stopped", json!({}));
        }
        self.state = SessionState::Stopped;
    }

    /// Releases the active stream and loaded media. Safe to call more than
    /// once; `Drop` routes through here so teardown happens on every exit
    /// path, error states included.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if self.engine.is_playing() {
            self.engine.stop();
        }
        self.current = None;
        self.state = SessionState::Stopped;
        logger().info("playback.closed", json!({}));
    }
}

impl<E: MediaEngine> Drop for PlaybackSession<E> {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use crate::config::PlaybackConfig;
    use crate::logging::init_logger;

    use super::{MediaEngine, MediaOptions, PlaybackError, PlaybackSession, SessionState};

    #[derive(Default)]
    struct EngineLog {
        media_alive: usize,
        stops: usize,
        last_volume: Option<u8>,
        playing: bool,
    }

    struct MockMedia {
        url: String,
        log: Rc<RefCell<EngineLog>>,
    }

    impl Drop for MockMedia {
        fn drop(&mut self) {
            self.log.borrow_mut().media_alive -= 1;
        }
    }

    struct MockEngine {
        log: Rc<RefCell<EngineLog>>,
        fail_create: bool,
        fail_play: bool,
    }

    impl MockEngine {
        fn new() -> (Self, Rc<RefCell<EngineLog>>) {
            let log = Rc::new(RefCell::new(EngineLog::default()));
            (
                Self {
                    log: log.clone(),
                    fail_create: false,
                    fail_play: false,
                },
                log,
            )
        }
    }

    impl MediaEngine for MockEngine {
        type Media = MockMedia;

        fn create_media(
            &mut self,
            url: &str,
            _options: &MediaOptions,
        ) -> Result<Self::Media, PlaybackError> {
            if self.fail_create {
                return Err(PlaybackError::MediaRejected("unsupported stream".into()));
            }
            self.log.borrow_mut().media_alive += 1;
            Ok(MockMedia {
                url: url.to_string(),
                log: self.log.clone(),
            })
        }

        fn play(&mut self, _media: &Self::Media) -> Result<(), PlaybackError> {
            if self.fail_play {
                return Err(PlaybackError::Engine("play refused".into()));
            }
            self.log.borrow_mut().playing = true;
            Ok(())
        }

        fn stop(&mut self) {
            let mut log = self.log.borrow_mut();
            log.stops += 1;
            log.playing = false;
        }

        fn is_playing(&self) -> bool {
            self.log.borrow().playing
        }

        fn set_volume(&mut self, volume: u8) {
            self.log.borrow_mut().last_volume = Some(volume);
        }
    }

    fn config() -> PlaybackConfig {
        PlaybackConfig {
            network_caching_ms: 3000,
            default_volume: 70,
        }
    }

    fn session() -> (PlaybackSession<MockEngine>, Rc<RefCell<EngineLog>>) {
        init_logger("radio-atlas-test");
        let (engine, log) = MockEngine::new();
        (PlaybackSession::new(engine, &config()), log)
    }

    #[test]
    fn play_starts_and_reports_success() {
        let (mut session, log) = session();
        assert_eq!(session.state(), SessionState::Idle);

        assert!(session.play("https://streams.example/a"));
        assert_eq!(session.state(), SessionState::Playing);
        assert_eq!(log.borrow().media_alive, 1);
        assert_eq!(log.borrow().last_volume, Some(70));
    }

    #[test]
    fn replaying_releases_the_previous_media() {
        let (mut session, log) = session();
        assert!(session.play("https://streams.example/a"));
        assert!(session.play("https://streams.example/b"));

        let log = log.borrow();
        // Exactly one media handle survives, and the engine was told to
        // stop the first stream before the second went live.
        assert_eq!(log.media_alive, 1);
        assert_eq!(log.stops, 1);
        drop(log);
        assert_eq!(
            session.current.as_ref().map(|m| m.url.as_str()),
            Some("https://streams.example/b")
        );
    }

    #[test]
    fn out_of_range_volumes_are_ignored() {
        let (mut session, log) = session();
        session.set_volume(150);
        assert_eq!(session.volume(), 70);
        session.set_volume(-1);
        assert_eq!(session.volume(), 70);
        assert_eq!(log.borrow().last_volume, None);

        session.set_volume(0);
        assert_eq!(session.volume(), 0);
        session.set_volume(100);
        assert_eq!(session.volume(), 100);
        assert_eq!(log.borrow().last_volume, Some(100));
    }

    #[test]
    fn volume_is_sticky_across_stop_and_play() {
        let (mut session, log) = session();
        session.set_volume(30);
        session.stop();
        assert!(session.play("https://streams.example/a"));
        assert_eq!(session.volume(), 30);
        assert_eq!(log.borrow().last_volume, Some(30));
    }

    #[test]
    fn stop_is_idempotent() {
        let (mut session, log) = session();
        session.stop();
        assert_eq!(session.state(), SessionState::Stopped);
        session.stop();
        assert_eq!(session.state(), SessionState::Stopped);
        // Nothing was playing, so the engine was never commanded.
        assert_eq!(log.borrow().stops, 0);
    }

    #[test]
    fn engine_failure_moves_to_error_and_recovers() {
        let (mut session, log) = session();
        session.engine.fail_play = true;
        assert!(!session.play("https://streams.example/a"));
        assert_eq!(session.state(), SessionState::Error);
        assert_eq!(log.borrow().media_alive, 0);

        session.engine.fail_play = false;
        assert!(session.play("https://streams.example/a"));
        assert_eq!(session.state(), SessionState::Playing);
    }

    #[test]
    fn create_failure_keeps_session_usable() {
        let (mut session, _log) = session();
        session.engine.fail_create = true;
        assert!(!session.play("https://streams.example/a"));
        assert_eq!(session.state(), SessionState::Error);

        session.engine.fail_create = false;
        assert!(session.play("https://streams.example/a"));
    }

    #[test]
    fn dropping_the_session_releases_everything_once() {
        let (mut session, log) = session();
        assert!(session.play("https://streams.example/a"));
        drop(session);

        let log = log.borrow();
        assert_eq!(log.media_alive, 0);
        assert!(!log.playing);
    }

    #[test]
    fn explicit_close_then_drop_releases_once() {
        let (mut session, log) = session();
        assert!(session.play("https://streams.example/a"));
        session.close();
        assert_eq!(log.borrow().media_alive, 0);
        let stops_after_close = log.borrow().stops;
        drop(session);
        assert_eq!(log.borrow().stops, stops_after_close);
    }
}
