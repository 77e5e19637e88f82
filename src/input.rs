use egui::{Pos2, Response};

/// Pointer events the canvas reacts to, in canvas coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CanvasInput {
    /// A drag started at this point
    Down(Pos2),
    /// The pointer moved while dragging
    Move(Pos2),
    /// The drag ended
    Up,
    /// Press and release without dragging
    Tap(Pos2),
}

/// The parts of an egui [`Response`] the input handler looks at
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PointerSample {
    pub drag_started: bool,
    pub dragged: bool,
    pub drag_stopped: bool,
    pub clicked: bool,
    /// Where the current press began, in screen coordinates
    pub press_origin: Option<Pos2>,
    /// Current pointer position, in screen coordinates
    pub position: Option<Pos2>,
}

impl PointerSample {
    pub fn from_response(response: &Response) -> Self {
        Self {
            drag_started: response.drag_started(),
            dragged: response.dragged(),
            drag_stopped: response.drag_stopped(),
            clicked: response.clicked(),
            press_origin: response.ctx.input(|input| input.pointer.press_origin()),
            position: response.interact_pointer_pos(),
        }
    }
}

/// Turns per-frame pointer state into [`CanvasInput`] events
#[derive(Debug, Default)]
pub struct InputHandler {
    last_position: Option<Pos2>,
}

impl InputHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events for one frame of the canvas widget
    pub fn process_response(&mut self, response: &Response) -> Vec<CanvasInput> {
        self.process(PointerSample::from_response(response), response.rect.min)
    }

    /// Events for one frame, with `origin` the screen position of the canvas' top-left corner
    pub fn process(&mut self, sample: PointerSample, origin: Pos2) -> Vec<CanvasInput> {
        let to_canvas = |pos: Pos2| (pos - origin).to_pos2();
        let mut events = Vec::new();

        if sample.drag_started {
            // egui reports a drag only after the pointer moved past a threshold,
            // so begin the stroke where the press happened
            if let Some(start) = sample.press_origin.or(sample.position) {
                events.push(CanvasInput::Down(to_canvas(start)));
                self.last_position = Some(start);
            }
        }

        if sample.dragged {
            if let Some(pos) = sample.position {
                if self.last_position != Some(pos) {
                    events.push(CanvasInput::Move(to_canvas(pos)));
                    self.last_position = Some(pos);
                }
            }
        }

        if sample.drag_stopped {
            events.push(CanvasInput::Up);
            self.last_position = None;
        }

        if sample.clicked {
            if let Some(pos) = sample.position {
                events.push(CanvasInput::Tap(to_canvas(pos)));
            }
        }

        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use egui::pos2;

    const ORIGIN: Pos2 = pos2(100.0, 50.0);

    #[test]
    fn test_drag_sequence() {
        let mut handler = InputHandler::new();

        let start = handler.process(
            PointerSample {
                drag_started: true,
                dragged: true,
                press_origin: Some(pos2(110.0, 60.0)),
                position: Some(pos2(115.0, 60.0)),
                ..Default::default()
            },
            ORIGIN,
        );
        assert_eq!(
            start,
            vec![CanvasInput::Down(pos2(10.0, 10.0)), CanvasInput::Move(pos2(15.0, 10.0))]
        );

        // No movement, no event
        let still = handler.process(
            PointerSample {
                dragged: true,
                position: Some(pos2(115.0, 60.0)),
                ..Default::default()
            },
            ORIGIN,
        );
        assert!(still.is_empty());

        let end = handler.process(
            PointerSample {
                drag_stopped: true,
                position: Some(pos2(115.0, 60.0)),
                ..Default::default()
            },
            ORIGIN,
        );
        assert_eq!(end, vec![CanvasInput::Up]);
    }

    #[test]
    fn test_click_is_tap() {
        let mut handler = InputHandler::new();
        let events = handler.process(
            PointerSample {
                clicked: true,
                position: Some(pos2(101.0, 51.0)),
                ..Default::default()
            },
            ORIGIN,
        );
        assert_eq!(events, vec![CanvasInput::Tap(pos2(1.0, 1.0))]);
    }
}
