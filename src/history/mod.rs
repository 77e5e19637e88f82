mod notify;

use egui::{Color32, Pos2};
use log::{debug, trace};
use uuid::Uuid;

use crate::document::CanvasDocument;
use crate::stroke::{Stroke, StrokeStyle};

pub use notify::{ChangeNotifier, ChangeSubscription};

/// What kind of mutation produced a [`HistoryChange`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// A new stroke was started
    Inserted,
    /// The newest stroke moved onto the redo stack
    Undo,
    /// The most recently undone stroke came back
    Redo,
    /// Everything was discarded
    Reset,
    /// The history was replaced by an imported document
    Imported,
}

/// Notification published after every history transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryChange {
    pub kind: ChangeKind,
    /// Number of visible strokes after the change
    pub undo_count: usize,
    /// Number of strokes that can be redone after the change
    pub redo_count: usize,
}

pub type HistorySubscription = ChangeSubscription<HistoryChange>;

/// Two-stack stroke history with linear undo/redo.
///
/// `active` holds the visible strokes oldest-first; the last one is the stroke
/// currently receiving points. `redo` holds undone strokes with the most
/// recently undone last. Starting a new stroke throws the redo branch away.
///
/// The history is owned by the input thread and is not shared, only its change
/// notifications cross threads.
#[derive(Debug)]
pub struct StrokeHistory {
    active: Vec<Stroke>,
    redo: Vec<Stroke>,
    background: Color32,
    revision: u64,
    notifier: ChangeNotifier<HistoryChange>,
}

impl Default for StrokeHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl StrokeHistory {
    pub fn new() -> Self {
        Self::with_background(Color32::BLACK)
    }

    pub fn with_background(background: Color32) -> Self {
        Self {
            active: Vec::new(),
            redo: Vec::new(),
            background,
            revision: 0,
            notifier: ChangeNotifier::new(),
        }
    }

    /// Subscribe to history changes published from now on
    pub fn subscribe(&self) -> HistorySubscription {
        self.notifier.subscribe()
    }

    /// Start a new stroke at `first_point` using `style`, discarding the redo branch
    pub fn insert_new_stroke(&mut self, first_point: Pos2, style: &StrokeStyle) -> Uuid {
        let stroke = Stroke::begin(first_point, style);
        let id = stroke.id();

        self.active.push(stroke);
        self.redo.clear();
        self.bump();

        debug!("Inserted stroke {} ({} active)", id, self.active.len());
        self.notify(ChangeKind::Inserted);
        id
    }

    /// Append a point to the stroke being drawn.
    ///
    /// Returns false without touching anything when there is no stroke yet,
    /// which happens when a move arrives before any press.
    pub fn append_point(&mut self, point: Pos2) -> bool {
        let Some(stroke) = self.active.last_mut() else {
            trace!("Ignoring point {:?}: no stroke in progress", point);
            return false;
        };
        stroke.push_point(point);
        self.bump();
        true
    }

    /// Move the newest stroke onto the redo stack
    pub fn undo(&mut self) -> bool {
        let Some(stroke) = self.active.pop() else {
            return false;
        };
        debug!("Undo stroke {}", stroke.id());
        self.redo.push(stroke);
        self.bump();
        self.notify(ChangeKind::Undo);
        true
    }

    /// Restore the most recently undone stroke
    pub fn redo(&mut self) -> bool {
        let Some(stroke) = self.redo.pop() else {
            return false;
        };
        debug!("Redo stroke {}", stroke.id());
        self.active.push(stroke);
        self.bump();
        self.notify(ChangeKind::Redo);
        true
    }

    /// Discard every stroke. This cannot be undone.
    pub fn reset(&mut self) {
        self.clear();
        debug!("History reset");
        self.notify(ChangeKind::Reset);
    }

    /// Snapshot of the background and the visible strokes
    pub fn export_document(&self) -> CanvasDocument {
        CanvasDocument::new(self.background, self.active.clone())
    }

    /// Replace the whole history with `document`; nothing is left to redo
    pub fn import_document(&mut self, document: CanvasDocument) {
        self.clear();
        let (background, strokes) = document.into_parts();
        self.background = background;
        self.active.extend(strokes);

        debug!("Imported document with {} strokes", self.active.len());
        self.notify(ChangeKind::Imported);
    }

    pub fn set_background(&mut self, color: Color32) {
        if self.background != color {
            self.background = color;
            self.bump();
        }
    }

    pub fn background(&self) -> Color32 {
        self.background
    }

    /// Visible strokes, oldest first
    pub fn active(&self) -> &[Stroke] {
        &self.active
    }

    /// Undone strokes, most recently undone last
    pub fn redo_stack(&self) -> &[Stroke] {
        &self.redo
    }

    pub fn undo_count(&self) -> usize {
        self.active.len()
    }

    pub fn redo_count(&self) -> usize {
        self.redo.len()
    }

    pub fn can_undo(&self) -> bool {
        !self.active.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Counter that changes whenever anything visible changes
    pub fn revision(&self) -> u64 {
        self.revision
    }

    fn clear(&mut self) {
        self.active.clear();
        self.redo.clear();
        self.bump();
    }

    fn bump(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }

    fn notify(&self, kind: ChangeKind) {
        self.notifier.publish(HistoryChange {
            kind,
            undo_count: self.active.len(),
            redo_count: self.redo.len(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use egui::pos2;

    fn history_with_strokes(count: usize) -> StrokeHistory {
        let mut history = StrokeHistory::new();
        let style = StrokeStyle::default();
        for i in 0..count {
            history.insert_new_stroke(pos2(i as f32, 0.0), &style);
            history.append_point(pos2(i as f32, 10.0));
        }
        history
    }

    #[test]
    fn test_append_without_stroke_is_ignored() {
        let mut history = StrokeHistory::new();
        let mut changes = history.subscribe();
        let revision = history.revision();

        assert!(!history.append_point(pos2(1.0, 1.0)));
        assert_eq!(history.revision(), revision);
        assert_eq!(changes.try_next(), None);
    }

    #[test]
    fn test_append_goes_to_last_stroke() {
        let mut history = history_with_strokes(2);
        history.append_point(pos2(5.0, 5.0));

        assert_eq!(history.active()[0].points().len(), 2);
        assert_eq!(history.active()[1].points().len(), 3);
        assert_eq!(history.active()[1].points()[2], pos2(5.0, 5.0));
    }

    #[test]
    fn test_insert_notification() {
        let mut history = history_with_strokes(1);
        let mut changes = history.subscribe();

        history.insert_new_stroke(pos2(0.0, 0.0), &StrokeStyle::default());
        assert_eq!(
            changes.try_next(),
            Some(HistoryChange { kind: ChangeKind::Inserted, undo_count: 2, redo_count: 0 })
        );

        // Appending points is silent
        history.append_point(pos2(1.0, 1.0));
        assert_eq!(changes.try_next(), None);
    }

    #[test]
    fn test_undo_redo_notifications() {
        let mut history = history_with_strokes(3);
        let mut changes = history.subscribe();

        assert!(history.undo());
        assert_eq!(
            changes.try_next(),
            Some(HistoryChange { kind: ChangeKind::Undo, undo_count: 2, redo_count: 1 })
        );

        assert!(history.redo());
        assert_eq!(
            changes.try_next(),
            Some(HistoryChange { kind: ChangeKind::Redo, undo_count: 3, redo_count: 0 })
        );

        assert!(!history.redo());
        assert_eq!(changes.try_next(), None);
    }

    #[test]
    fn test_background_is_exported() {
        let mut history = history_with_strokes(1);
        history.set_background(Color32::WHITE);

        let document = history.export_document();
        assert_eq!(document.background(), Color32::WHITE);
        assert_eq!(document.strokes().len(), 1);
    }

    #[test]
    fn test_import_emits_resulting_size() {
        let source = history_with_strokes(2);
        let mut history = history_with_strokes(1);
        history.undo();
        let mut changes = history.subscribe();

        history.import_document(source.export_document());

        assert_eq!(
            changes.try_next(),
            Some(HistoryChange { kind: ChangeKind::Imported, undo_count: 2, redo_count: 0 })
        );
        assert!(!history.can_redo());
    }
}
