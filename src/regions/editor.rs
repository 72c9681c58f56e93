use uuid::Uuid;

use crate::error::{CaptureError, CaptureResult};
use crate::models::{palette_color, Region};

use super::geometry::{Point, Rect, Viewport};
use super::render::{render, DrawCommand};

/// Drags smaller than this on either axis (in source pixels) are discarded.
pub const MIN_REGION_SIZE: f64 = 10.0;

#[derive(Debug, Clone, Copy)]
struct DragState {
    origin: Point,
    current: Rect,
}

/// Owns the region list and the in-progress drag.
///
/// Geometry changes are refused while locked (an active recording or a replay
/// snapshot); label edits are always allowed.
#[derive(Debug, Default)]
pub struct RegionEditor {
    regions: Vec<Region>,
    drag: Option<DragState>,
    locked: bool,
    source_active: bool,
    /// Regions committed since the last clear. Drives default labels and colors.
    created: usize,
}

impl RegionEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn region(&self, id: &str) -> Option<&Region> {
        self.regions.iter().find(|region| region.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// The dashed rectangle under the pointer, if a drag is in progress.
    pub fn provisional(&self) -> Option<Rect> {
        self.drag.map(|drag| drag.current)
    }

    /// Tells the editor whether a live pixel source is attached. Without one,
    /// pointer input is ignored.
    pub fn set_source_active(&mut self, active: bool) {
        self.source_active = active;
        if !active {
            self.drag = None;
        }
    }

    pub fn begin_drag(&mut self, pointer: Point, viewport: &Viewport) -> bool {
        if !self.source_active || self.locked {
            return false;
        }

        let Some(origin) = viewport.to_source(pointer) else {
            return false;
        };

        self.drag = Some(DragState {
            origin,
            current: Rect::from_corners(origin, origin),
        });
        true
    }

    pub fn update_drag(&mut self, pointer: Point, viewport: &Viewport) -> Option<Rect> {
        let drag = self.drag.as_mut()?;
        let position = viewport.to_source(pointer)?;
        drag.current = Rect::from_corners(drag.origin, position);
        Some(drag.current)
    }

    /// Finishes the drag. Returns the committed region, or `None` if the drag was
    /// too small (or the editor was locked in the meantime).
    pub fn end_drag(&mut self, pointer: Point, viewport: &Viewport) -> Option<&Region> {
        let drag = self.drag.take()?;
        if self.locked {
            return None;
        }

        let rect = match viewport.to_source(pointer) {
            Some(position) => Rect::from_corners(drag.origin, position),
            None => drag.current,
        };

        if !rect.meets_minimum(MIN_REGION_SIZE) {
            return None;
        }

        let ordinal = self.created;
        self.created += 1;
        self.regions.push(Region {
            id: Uuid::new_v4().to_string(),
            x: rect.x,
            y: rect.y,
            width: rect.width,
            height: rect.height,
            color: palette_color(ordinal).to_string(),
            label: format!("Region {}", ordinal + 1),
        });
        self.regions.last()
    }

    /// Pointer left the drawing surface.
    pub fn cancel_drag(&mut self) {
        self.drag = None;
    }

    pub fn update_label(&mut self, id: &str, label: &str) -> CaptureResult<()> {
        let region = self
            .regions
            .iter_mut()
            .find(|region| region.id == id)
            .ok_or_else(|| CaptureError::validation(format!("unknown region {id}")))?;
        region.label = label.to_string();
        Ok(())
    }

    pub fn remove(&mut self, id: &str) -> CaptureResult<Region> {
        if self.locked {
            return Err(CaptureError::validation(
                "regions are locked while recording",
            ));
        }

        let position = self
            .regions
            .iter()
            .position(|region| region.id == id)
            .ok_or_else(|| CaptureError::validation(format!("unknown region {id}")))?;
        Ok(self.regions.remove(position))
    }

    pub fn clear(&mut self) -> CaptureResult<()> {
        if self.locked {
            return Err(CaptureError::validation(
                "regions are locked while recording",
            ));
        }
        self.reset();
        Ok(())
    }

    pub fn lock(&mut self) {
        self.locked = true;
        self.drag = None;
    }

    pub fn unlock(&mut self) {
        self.locked = false;
    }

    /// Drops every region and the drag regardless of the lock.
    pub(crate) fn reset(&mut self) {
        self.regions.clear();
        self.drag = None;
        self.created = 0;
    }

    /// Replaces the region list with a frozen snapshot (replay).
    pub(crate) fn load_snapshot(&mut self, regions: Vec<Region>) {
        self.drag = None;
        self.created = regions.len();
        self.regions = regions;
    }

    pub fn render(&self) -> Vec<DrawCommand> {
        render(&self.regions, self.provisional().as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::FrameSize;
    use crate::regions::DisplayBox;

    fn viewport() -> Viewport {
        Viewport::new(DisplayBox::sized(640.0, 360.0), FrameSize::new(1280, 720))
    }

    fn identity() -> Viewport {
        Viewport::new(DisplayBox::sized(1280.0, 720.0), FrameSize::new(1280, 720))
    }

    fn active_editor() -> RegionEditor {
        let mut editor = RegionEditor::new();
        editor.set_source_active(true);
        editor
    }

    fn draw(editor: &mut RegionEditor, from: (f64, f64), to: (f64, f64)) -> Option<Region> {
        let vp = identity();
        editor.begin_drag(Point::new(from.0, from.1), &vp);
        editor.update_drag(Point::new(to.0, to.1), &vp);
        editor.end_drag(Point::new(to.0, to.1), &vp).cloned()
    }

    #[test]
    fn scaled_drag_commits_source_space_region() {
        let mut editor = active_editor();
        let vp = viewport();

        assert!(editor.begin_drag(Point::new(100.0, 100.0), &vp));
        let region = editor
            .end_drag(Point::new(200.0, 200.0), &vp)
            .cloned()
            .expect("region committed");

        assert_eq!(
            (region.x, region.y, region.width, region.height),
            (200.0, 200.0, 200.0, 200.0)
        );
        assert_eq!(region.label, "Region 1");
        assert_eq!(region.color, "#ff6b6b");
        assert!(!editor.is_dragging());
    }

    #[test]
    fn undersized_drags_are_discarded() {
        let mut editor = active_editor();

        assert!(draw(&mut editor, (0.0, 0.0), (9.0, 50.0)).is_none());
        assert!(draw(&mut editor, (0.0, 0.0), (50.0, 9.5)).is_none());
        assert!(editor.is_empty());
        assert!(!editor.is_dragging());

        let region = draw(&mut editor, (0.0, 0.0), (10.0, 10.0)).expect("minimum size accepted");
        assert_eq!(region.label, "Region 1");
        assert_eq!(editor.regions().len(), 1);
    }

    #[test]
    fn labels_and_colors_follow_creation_order() {
        let mut editor = active_editor();
        for i in 0..7 {
            let offset = f64::from(i) * 20.0;
            draw(&mut editor, (offset, 0.0), (offset + 15.0, 15.0)).expect("committed");
        }

        let labels: Vec<_> = editor.regions().iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels[0], "Region 1");
        assert_eq!(labels[6], "Region 7");
        assert_eq!(editor.regions()[6].color, editor.regions()[0].color);
        assert_eq!(editor.regions()[1].color, "#4ecdc4");
    }

    #[test]
    fn reverse_drag_produces_normalised_rect() {
        let mut editor = active_editor();
        let vp = identity();
        editor.begin_drag(Point::new(300.0, 300.0), &vp);
        let provisional = editor
            .update_drag(Point::new(100.0, 200.0), &vp)
            .expect("dragging");

        assert_eq!(provisional.x, 100.0);
        assert_eq!(provisional.y, 200.0);
        assert_eq!(provisional.width, 200.0);
        assert_eq!(provisional.height, 100.0);
    }

    #[test]
    fn pointer_ignored_without_source() {
        let mut editor = RegionEditor::new();
        assert!(!editor.begin_drag(Point::new(1.0, 1.0), &identity()));
        assert!(draw(&mut editor, (0.0, 0.0), (100.0, 100.0)).is_none());
    }

    #[test]
    fn locked_editor_rejects_geometry_but_allows_labels() {
        let mut editor = active_editor();
        let region = draw(&mut editor, (0.0, 0.0), (50.0, 50.0)).expect("committed");
        editor.lock();

        assert!(editor.remove(&region.id).unwrap_err().is_validation());
        assert!(editor.clear().unwrap_err().is_validation());
        assert!(!editor.begin_drag(Point::new(0.0, 0.0), &identity()));
        assert_eq!(editor.regions().len(), 1);

        editor.update_label(&region.id, "Price").expect("label edit");
        assert_eq!(editor.regions()[0].label, "Price");

        editor.unlock();
        editor.remove(&region.id).expect("removed after unlock");
        assert!(editor.is_empty());
    }

    #[test]
    fn lock_mid_drag_discards_it() {
        let mut editor = active_editor();
        let vp = identity();
        editor.begin_drag(Point::new(0.0, 0.0), &vp);
        editor.lock();
        assert!(editor.end_drag(Point::new(100.0, 100.0), &vp).is_none());
        assert!(editor.is_empty());
    }

    #[test]
    fn labels_stay_unique_after_removal() {
        let mut editor = active_editor();
        let first = draw(&mut editor, (0.0, 0.0), (50.0, 50.0)).expect("committed");
        draw(&mut editor, (60.0, 0.0), (110.0, 50.0)).expect("committed");
        editor.remove(&first.id).expect("removed");

        let third = draw(&mut editor, (120.0, 0.0), (170.0, 50.0)).expect("committed");
        assert_eq!(third.label, "Region 3");

        editor.clear().expect("cleared");
        let fresh = draw(&mut editor, (0.0, 0.0), (50.0, 50.0)).expect("committed");
        assert_eq!(fresh.label, "Region 1");
    }

    #[test]
    fn unknown_region_is_a_validation_error() {
        let mut editor = active_editor();
        assert!(editor.update_label("missing", "x").unwrap_err().is_validation());
        assert!(editor.remove("missing").unwrap_err().is_validation());
    }
}
