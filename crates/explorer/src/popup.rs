//! The single info popup and its carousel.
//!
//! Phases run `Closed -> Opening -> Open -> Closed`. The popup element is
//! attached as soon as it opens, but buttons are only live once the focus
//! animation has had time to finish; until then carousel and itinerary
//! actions are ignored. A newer `open` always wins over one still opening.

use std::time::Duration;

use catalog::Spot;
use engine::{AddButtonState, EaseOptions, MapEngine, Padding, PopupContent, PopupSpec};
use foundation::geo::LonLat;
use foundation::handles::PopupHandle;
use foundation::ids::SpotId;
use foundation::time::Time;
use runtime::{TimerId, TimerQueue};
use tracing::{debug, warn};

use crate::config::PopupFocus;
use crate::itinerary::Itinerary;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PopupPhase {
    Closed,
    Opening,
    Open,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum PopupTimer {
    OpeningDone,
    Autoplay,
}

#[derive(Debug)]
struct ActivePopup {
    spot: Spot,
    handle: PopupHandle,
    phase: PopupPhase,
    image_index: usize,
    added: bool,
    autoplay: Option<TimerId>,
}

impl ActivePopup {
    fn content(&self) -> PopupContent {
        popup_content(&self.spot, self.phase, self.image_index, self.added)
    }
}

fn popup_content(spot: &Spot, phase: PopupPhase, image_index: usize, added: bool) -> PopupContent {
    PopupContent {
        title: spot.name().to_string(),
        location: spot.location.clone(),
        categories: spot.categories.iter().map(|c| c.label()).collect(),
        image: spot.images.get(image_index).cloned(),
        image_index,
        image_count: spot.images.len(),
        add_button: if added {
            AddButtonState::Added
        } else {
            AddButtonState::Add
        },
        interactive: phase == PopupPhase::Open,
    }
}

#[derive(Debug)]
pub struct PopupController {
    offset_px: f64,
    focus: PopupFocus,
    autoplay_every: Option<Duration>,
    active: Option<ActivePopup>,
    timers: TimerQueue<PopupTimer>,
}

impl PopupController {
    pub fn new(offset_px: f64, focus: PopupFocus, autoplay_every: Option<Duration>) -> Self {
        Self {
            offset_px,
            focus,
            autoplay_every,
            active: None,
            timers: TimerQueue::new(),
        }
    }

    pub fn phase(&self) -> PopupPhase {
        self.active.as_ref().map_or(PopupPhase::Closed, |a| a.phase)
    }

    pub fn target(&self) -> Option<&SpotId> {
        self.active.as_ref().map(|a| &a.spot.id)
    }

    pub fn image_index(&self) -> Option<usize> {
        self.active.as_ref().map(|a| a.image_index)
    }

    pub fn handle(&self) -> Option<PopupHandle> {
        self.active.as_ref().map(|a| a.handle)
    }

    /// Earliest pending opening/autoplay deadline.
    pub fn next_deadline(&self) -> Option<Time> {
        self.timers.next_deadline()
    }

    /// Opens the popup on `spot`, tearing down any popup on another spot
    /// first. Re-opening the current target keeps it and refocuses the camera.
    pub fn open(&mut self, engine: &mut dyn MapEngine, spot: &Spot, added: bool, now: Time) -> bool {
        let position = match spot.valid_coordinates() {
            Ok(p) => p,
            Err(defect) => {
                warn!(spot = %spot.id, %defect, "cannot open popup");
                return false;
            }
        };

        if let Some(active) = &self.active
            && active.spot.id == spot.id
        {
            self.focus_camera(engine, position);
            return true;
        }

        if let Some(previous) = self.active.as_ref().map(|a| a.spot.id.clone()) {
            debug!(%previous, next = %spot.id, "replacing popup");
        }
        self.close(engine);

        let handle = engine.attach_popup(PopupSpec {
            position,
            offset_px: [0.0, -self.offset_px],
            content: popup_content(spot, PopupPhase::Opening, 0, added),
        });
        self.active = Some(ActivePopup {
            spot: spot.clone(),
            handle,
            phase: PopupPhase::Opening,
            image_index: 0,
            added,
            autoplay: None,
        });

        self.focus_camera(engine, position);
        self.timers.schedule(
            now.after(Duration::from_millis(self.focus.duration_ms)),
            PopupTimer::OpeningDone,
        );
        true
    }

    /// Tears down the popup in any phase. Returns `false` if none was open.
    pub fn close(&mut self, engine: &mut dyn MapEngine) -> bool {
        let Some(active) = self.active.take() else {
            return false;
        };
        self.timers.clear();
        if !engine.detach_popup(active.handle) {
            warn!(spot = %active.spot.id, "engine did not know popup being closed");
        }
        true
    }

    /// Closes the popup if it belongs to a spot whose marker just left view.
    pub fn on_marker_removed(&mut self, engine: &mut dyn MapEngine, spot: &SpotId) -> bool {
        if self.target() != Some(spot) {
            return false;
        }
        debug!(%spot, "marker left view; closing its popup");
        self.close(engine)
    }

    pub fn next_image(&mut self, engine: &mut dyn MapEngine) -> bool {
        self.step_image(engine, 1)
    }

    pub fn prev_image(&mut self, engine: &mut dyn MapEngine) -> bool {
        self.step_image(engine, -1)
    }

    /// Jumps the carousel to `index`. Out-of-range indices are ignored.
    pub fn go_to_image(&mut self, engine: &mut dyn MapEngine, index: usize) -> bool {
        let Some(active) = self.interactive_mut() else {
            return false;
        };
        if index >= active.spot.images.len() {
            return false;
        }
        active.image_index = index;
        self.stop_autoplay();
        self.refresh(engine);
        true
    }

    /// Adds the target to `itinerary` and flips the button to its done state.
    /// The popup stays open. `None` when there is no interactive popup;
    /// otherwise whether the add occurred.
    pub fn add_to_itinerary(
        &mut self,
        engine: &mut dyn MapEngine,
        itinerary: &mut Itinerary,
    ) -> Option<bool> {
        let active = self.interactive_mut()?;
        active.added = true;
        let spot = active.spot.clone();
        let added = itinerary.add(spot);
        self.refresh(engine);
        Some(added)
    }

    /// Re-reads the button state after an itinerary change made elsewhere.
    pub fn sync_added(&mut self, engine: &mut dyn MapEngine, itinerary: &Itinerary) {
        let Some(active) = self.active.as_mut() else {
            return;
        };
        let added = itinerary.contains(&active.spot.id);
        if active.added != added {
            active.added = added;
            self.refresh(engine);
        }
    }

    /// Fires due timers: completes the opening phase and advances autoplay.
    pub fn tick(&mut self, engine: &mut dyn MapEngine, now: Time) {
        for (_, timer) in self.timers.advance_to(now) {
            let Some(active) = self.active.as_mut() else {
                break;
            };
            match timer {
                PopupTimer::OpeningDone => {
                    active.phase = PopupPhase::Open;
                    if let Some(every) = self.autoplay_every
                        && active.spot.images.len() > 1
                    {
                        active.autoplay =
                            Some(self.timers.schedule(now.after(every), PopupTimer::Autoplay));
                    }
                    debug!(spot = %active.spot.id, "popup open");
                }
                PopupTimer::Autoplay => {
                    let n = active.spot.images.len();
                    if n > 1 {
                        active.image_index = (active.image_index + 1) % n;
                    }
                    active.autoplay = self
                        .autoplay_every
                        .map(|every| self.timers.schedule(now.after(every), PopupTimer::Autoplay));
                }
            }
            self.refresh(engine);
        }
    }

    fn step_image(&mut self, engine: &mut dyn MapEngine, delta: isize) -> bool {
        let Some(active) = self.interactive_mut() else {
            return false;
        };
        let n = active.spot.images.len();
        if n <= 1 {
            return false;
        }
        active.image_index = (active.image_index as isize + delta).rem_euclid(n as isize) as usize;
        self.stop_autoplay();
        self.refresh(engine);
        true
    }

    fn interactive_mut(&mut self) -> Option<&mut ActivePopup> {
        self.active.as_mut().filter(|a| a.phase == PopupPhase::Open)
    }

    fn stop_autoplay(&mut self) {
        if let Some(id) = self.active.as_mut().and_then(|a| a.autoplay.take()) {
            self.timers.cancel(id);
        }
    }

    fn refresh(&self, engine: &mut dyn MapEngine) {
        if let Some(active) = &self.active {
            engine.update_popup(active.handle, active.content());
        }
    }

    fn focus_camera(&self, engine: &mut dyn MapEngine, position: LonLat) {
        let zoom = engine.camera().zoom.max(self.focus.min_zoom);
        engine.ease_to(EaseOptions {
            center: position,
            zoom,
            padding: Padding::top(self.focus.top_padding_px),
            duration: Duration::from_millis(self.focus.duration_ms),
        });
    }
}
