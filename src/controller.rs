//! Single-session edit controller.
//!
//! Every mutating operation is dispatched to a worker thread and tracked by
//! a [`Ticket`]. While one is in flight the controller is busy and rejects
//! further operations as no-ops. Completions are folded back into the
//! session and history only from [`EditController::poll`] or
//! [`EditController::wait`], so all state changes happen on the thread that
//! owns the controller.

use std::path::PathBuf;
use std::sync::{Arc, mpsc};
use std::time::Instant;

use image::DynamicImage;

use crate::catalog::FilterId;
use crate::crop::{CropOutcome, CropUi};
use crate::error::EditError;
use crate::export::ImageSink;
use crate::history::EditHistory;
use crate::processing::RenderEngine;
use crate::session::{Edit, FlipAxis, JobOutput, RenderJob, RenderSession};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ticket(u64);

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Operation {
    Load,
    SelectFilter(FilterId),
    Brightness,
    Contrast,
    Saturation,
    Rotate,
    Flip(FlipAxis),
    Crop,
    Save,
}

#[derive(Debug)]
pub enum Outcome {
    /// A new image was rendered and pushed onto the history.
    Rendered,
    Saved(PathBuf),
    Failed(EditError),
}

#[derive(Debug)]
pub struct Completion {
    pub ticket: Ticket,
    pub operation: Operation,
    pub outcome: Outcome,
}

impl Completion {
    /// Short message for a transient on-screen notice, if any.
    pub fn notice(&self) -> Option<String> {
        match &self.outcome {
            Outcome::Rendered => None,
            Outcome::Saved(_) => Some("Image saved successfully".to_string()),
            Outcome::Failed(err) => Some(notice_for(self.operation, err)),
        }
    }
}

pub fn notice_for(operation: Operation, err: &EditError) -> String {
    let text = match operation {
        Operation::Load => "Error loading image",
        Operation::SelectFilter(_) => "Error applying filter",
        Operation::Brightness => "Error adjusting brightness",
        Operation::Contrast => "Error adjusting contrast",
        Operation::Saturation => "Error adjusting saturation",
        Operation::Rotate => "Error rotating image",
        Operation::Flip(_) => "Error flipping image",
        Operation::Save => "Error saving image",
        Operation::Crop => {
            let reason = match err {
                EditError::CropFailed(reason) => reason.clone(),
                other => other.to_string(),
            };
            return format!("Error cropping image: {reason}");
        }
    };
    text.to_string()
}

enum Task {
    Render(RenderJob),
    Save(DynamicImage),
}

enum WorkerResult {
    Rendered(JobOutput),
    Saved(Result<PathBuf, EditError>),
}

struct Pending {
    ticket: Ticket,
    operation: Operation,
    started: Instant,
    rx: mpsc::Receiver<WorkerResult>,
}

/// Result of a dispatch: `Ok(Some)` when work started, `Ok(None)` when the
/// request was ignored (busy, cancelled, or nothing to do).
pub type Dispatch = Result<Option<Ticket>, EditError>;

pub struct EditController {
    engine: Arc<dyn RenderEngine>,
    sink: Arc<dyn ImageSink>,
    session: RenderSession,
    history: EditHistory<DynamicImage>,
    pending: Option<Pending>,
    next_ticket: u64,
}

impl EditController {
    pub fn new(
        engine: Arc<dyn RenderEngine>,
        sink: Arc<dyn ImageSink>,
        history_limit: usize,
    ) -> Self {
        Self {
            engine,
            sink,
            session: RenderSession::new(),
            history: EditHistory::with_limit(history_limit),
            pending: None,
            next_ticket: 0,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    pub fn session(&self) -> &RenderSession {
        &self.session
    }

    pub fn history(&self) -> &EditHistory<DynamicImage> {
        &self.history
    }

    /// The image currently on screen.
    pub fn displayed(&self) -> Option<&DynamicImage> {
        self.history.current()
    }

    pub fn can_undo(&self) -> bool {
        !self.is_busy() && self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        !self.is_busy() && self.history.can_redo()
    }

    /// Starts a new session on `image`, clearing history. The initial
    /// render becomes the first snapshot.
    pub fn load_image(&mut self, image: DynamicImage) -> Dispatch {
        if self.is_busy() {
            return Ok(None);
        }
        self.session = RenderSession::with_image(image);
        self.history.reset();
        self.submit(Operation::Load, Edit::Refresh)
    }

    pub fn select_filter(&mut self, id: FilterId) -> Dispatch {
        self.submit(Operation::SelectFilter(id), Edit::SelectFilter(id))
    }

    pub fn set_brightness(&mut self, progress: i32) -> Dispatch {
        self.submit(Operation::Brightness, Edit::Brightness(progress))
    }

    pub fn set_contrast(&mut self, progress: i32) -> Dispatch {
        self.submit(Operation::Contrast, Edit::Contrast(progress))
    }

    pub fn set_saturation(&mut self, progress: i32) -> Dispatch {
        self.submit(Operation::Saturation, Edit::Saturation(progress))
    }

    pub fn rotate(&mut self, degrees: f32) -> Dispatch {
        self.submit(Operation::Rotate, Edit::Rotate(degrees))
    }

    pub fn flip(&mut self, axis: FlipAxis) -> Dispatch {
        self.submit(Operation::Flip(axis), Edit::Flip(axis))
    }

    /// Runs the crop UI on the session source and applies its outcome.
    pub fn crop_with(&mut self, ui: &mut dyn CropUi) -> Dispatch {
        if self.is_busy() {
            return Ok(None);
        }
        let source = self.session.source().ok_or(EditError::NoSourceImage)?;
        let outcome = ui.crop(source);
        self.apply_crop(outcome)
    }

    pub fn apply_crop(&mut self, outcome: CropOutcome) -> Dispatch {
        if self.is_busy() {
            return Ok(None);
        }
        match outcome {
            CropOutcome::Cropped(image) => self.submit(Operation::Crop, Edit::Crop(image)),
            CropOutcome::Cancelled => {
                tracing::debug!("crop cancelled");
                Ok(None)
            }
            CropOutcome::Failed(reason) => {
                tracing::warn!(%reason, "crop failed");
                Err(EditError::CropFailed(reason))
            }
        }
    }

    /// Persists the displayed image through the configured sink.
    pub fn save(&mut self) -> Dispatch {
        if self.is_busy() {
            return Ok(None);
        }
        let image = self.displayed().ok_or(EditError::NoSourceImage)?.clone();
        Ok(Some(self.spawn(Operation::Save, Task::Save(image))))
    }

    /// Steps back one snapshot. Ignored while busy or at the oldest one.
    pub fn undo(&mut self) -> Option<&DynamicImage> {
        if !self.can_undo() {
            return None;
        }
        self.history.undo().ok()
    }

    pub fn redo(&mut self) -> Option<&DynamicImage> {
        if !self.can_redo() {
            return None;
        }
        self.history.redo().ok()
    }

    /// Collects a finished operation without blocking.
    pub fn poll(&mut self) -> Option<Completion> {
        let received = match self.pending.as_ref()?.rx.try_recv() {
            Ok(result) => Some(result),
            Err(mpsc::TryRecvError::Empty) => return None,
            Err(mpsc::TryRecvError::Disconnected) => None,
        };
        let pending = self.pending.take()?;
        Some(self.finish(pending, received))
    }

    /// Blocks until the in-flight operation, if any, completes.
    pub fn wait(&mut self) -> Option<Completion> {
        let pending = self.pending.take()?;
        let received = pending.rx.recv().ok();
        Some(self.finish(pending, received))
    }

    fn submit(&mut self, operation: Operation, edit: Edit) -> Dispatch {
        if self.is_busy() {
            tracing::debug!(?operation, "busy, ignoring request");
            return Ok(None);
        }
        let job = self.session.prepare(edit)?;
        Ok(Some(self.spawn(operation, Task::Render(job))))
    }

    fn spawn(&mut self, operation: Operation, task: Task) -> Ticket {
        let ticket = Ticket(self.next_ticket);
        self.next_ticket += 1;

        let (tx, rx) = mpsc::channel();
        let engine = Arc::clone(&self.engine);
        let sink = Arc::clone(&self.sink);
        std::thread::spawn(move || {
            let result = match task {
                Task::Render(job) => WorkerResult::Rendered(job.execute(engine.as_ref())),
                Task::Save(image) => WorkerResult::Saved(sink.save(&image)),
            };
            let _ = tx.send(result);
        });

        tracing::debug!(ticket = ticket.0, ?operation, "dispatched");
        self.pending = Some(Pending {
            ticket,
            operation,
            started: Instant::now(),
            rx,
        });
        ticket
    }

    fn finish(&mut self, pending: Pending, received: Option<WorkerResult>) -> Completion {
        let outcome = match received {
            Some(WorkerResult::Rendered(output)) => match self.session.complete(output) {
                Ok(image) => {
                    self.history.push(image);
                    Outcome::Rendered
                }
                Err(err) => Outcome::Failed(err),
            },
            Some(WorkerResult::Saved(Ok(path))) => Outcome::Saved(path),
            Some(WorkerResult::Saved(Err(err))) => Outcome::Failed(err),
            None => Outcome::Failed(EditError::RenderFailure("worker stopped unexpectedly".into())),
        };

        let elapsed_ms = pending.started.elapsed().as_secs_f64() * 1000.0;
        match &outcome {
            Outcome::Failed(err) => tracing::warn!(
                ticket = pending.ticket.0,
                operation = ?pending.operation,
                error = %err,
                elapsed_ms,
                "operation failed"
            ),
            _ => tracing::debug!(
                ticket = pending.ticket.0,
                operation = ?pending.operation,
                elapsed_ms,
                history_len = self.history.len(),
                "operation finished"
            ),
        }

        Completion {
            ticket: pending.ticket,
            operation: pending.operation,
            outcome,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex, mpsc};

    use image::{DynamicImage, ImageBuffer, Rgba};

    use super::*;
    use crate::crop::{CropRect, RectCrop};
    use crate::processing::CpuEngine;
    use crate::stage::AdjustmentStage;

    /// Each render blocks until the test releases it through the gate.
    struct GatedEngine {
        gate: Mutex<mpsc::Receiver<()>>,
    }

    impl RenderEngine for GatedEngine {
        fn render(
            &self,
            image: &DynamicImage,
            stages: &[AdjustmentStage],
        ) -> Result<DynamicImage, EditError> {
            self.gate
                .lock()
                .unwrap()
                .recv()
                .map_err(|_| EditError::RenderFailure("gate closed".into()))?;
            CpuEngine.render(image, stages)
        }
    }

    /// Fails every render after the first `ok_renders`.
    struct FlakyEngine {
        ok_renders: Mutex<usize>,
    }

    impl RenderEngine for FlakyEngine {
        fn render(
            &self,
            image: &DynamicImage,
            stages: &[AdjustmentStage],
        ) -> Result<DynamicImage, EditError> {
            let mut left = self.ok_renders.lock().unwrap();
            if *left == 0 {
                return Err(EditError::RenderFailure("out of memory".into()));
            }
            *left -= 1;
            CpuEngine.render(image, stages)
        }
    }

    #[derive(Default)]
    struct MemorySink {
        saved: Mutex<Vec<DynamicImage>>,
    }

    impl ImageSink for MemorySink {
        fn save(&self, image: &DynamicImage) -> Result<PathBuf, EditError> {
            let mut saved = self.saved.lock().unwrap();
            saved.push(image.clone());
            Ok(PathBuf::from(format!("memory/{}.jpg", saved.len())))
        }
    }

    fn sample(w: u32, h: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(ImageBuffer::from_fn(w, h, |x, y| {
            Rgba([(x * 40) as u8, (y * 60) as u8, 120, 255])
        }))
    }

    fn controller() -> EditController {
        EditController::new(Arc::new(CpuEngine), Arc::new(MemorySink::default()), 32)
    }

    fn run(
        controller: &mut EditController,
        op: impl FnOnce(&mut EditController) -> Dispatch,
    ) -> Completion {
        assert!(op(controller).unwrap().is_some(), "operation was not started");
        controller.wait().expect("an operation should be in flight")
    }

    #[test]
    fn load_pushes_the_initial_snapshot() {
        let mut c = controller();
        let img = sample(4, 3);
        let done = run(&mut c, |c| c.load_image(img.clone()));
        assert!(matches!(done.outcome, Outcome::Rendered));
        assert_eq!(done.operation, Operation::Load);
        assert_eq!(c.history().len(), 1);
        assert_eq!(c.displayed().unwrap().to_rgba8(), img.to_rgba8());
        assert!(!c.can_undo());
        assert!(!c.can_redo());
    }

    #[test]
    fn operations_before_load_report_missing_image() {
        let mut c = controller();
        assert_eq!(c.select_filter(FilterId::Sepia), Err(EditError::NoSourceImage));
        assert_eq!(c.rotate(90.0), Err(EditError::NoSourceImage));
        assert_eq!(c.save(), Err(EditError::NoSourceImage));
        assert_eq!(
            c.crop_with(&mut RectCrop::dismissed()),
            Err(EditError::NoSourceImage)
        );
        assert!(!c.is_busy());
    }

    #[test]
    fn edits_append_to_history_and_undo_redo_walk_it() {
        let mut c = controller();
        run(&mut c, |c| c.load_image(sample(4, 2)));
        run(&mut c, |c| c.select_filter(FilterId::BlackWhite));
        run(&mut c, |c| c.rotate(90.0));
        assert_eq!(c.history().len(), 3);

        let rotated = c.displayed().unwrap().clone();
        assert_eq!((rotated.width(), rotated.height()), (2, 4));

        let back = c.undo().unwrap().clone();
        assert_eq!((back.width(), back.height()), (4, 2));
        assert!(c.can_redo());
        let forward = c.redo().unwrap().clone();
        assert_eq!(forward.to_rgba8(), rotated.to_rgba8());
        assert!(c.redo().is_none());
    }

    #[test]
    fn new_edit_after_undo_discards_redo_branch() {
        let mut c = controller();
        run(&mut c, |c| c.load_image(sample(3, 3)));
        run(&mut c, |c| c.select_filter(FilterId::Sepia));
        run(&mut c, |c| c.select_filter(FilterId::Hue));
        c.undo().unwrap();
        run(&mut c, |c| c.flip(FlipAxis::Horizontal));

        assert_eq!(c.history().len(), 3);
        assert_eq!(c.history().position(), Some(2));
        assert!(!c.can_redo());
    }

    #[test]
    fn busy_controller_rejects_operations_without_touching_history() {
        let (release, gate) = mpsc::channel();
        let engine = GatedEngine {
            gate: Mutex::new(gate),
        };
        let mut c = EditController::new(Arc::new(engine), Arc::new(MemorySink::default()), 32);

        let first = c.load_image(sample(2, 2)).unwrap().unwrap();
        assert!(c.is_busy());
        assert_eq!(c.select_filter(FilterId::Sepia), Ok(None));
        assert_eq!(c.set_brightness(80), Ok(None));
        assert_eq!(c.rotate(90.0), Ok(None));
        assert_eq!(c.flip(FlipAxis::Vertical), Ok(None));
        assert_eq!(c.save(), Ok(None));
        assert_eq!(c.load_image(sample(5, 5)), Ok(None));
        assert_eq!(c.apply_crop(CropOutcome::Cropped(sample(1, 1))), Ok(None));
        assert!(c.undo().is_none());
        assert!(c.redo().is_none());
        assert!(c.poll().is_none());

        release.send(()).unwrap();
        let done = c.wait().unwrap();
        assert_eq!(done.ticket, first);
        assert!(!c.is_busy());
        assert_eq!(c.history().len(), 1);
        assert_eq!(c.session().selected_filter(), FilterId::Original);
        assert_eq!(c.displayed().unwrap().width(), 2);

        let second = c.select_filter(FilterId::Sepia).unwrap().unwrap();
        assert!(second > first);
        release.send(()).unwrap();
        c.wait().unwrap();
        assert_eq!(c.history().len(), 2);
    }

    #[test]
    fn failed_render_keeps_last_good_state_and_reports_notice() {
        let engine = FlakyEngine {
            ok_renders: Mutex::new(1),
        };
        let mut c = EditController::new(Arc::new(engine), Arc::new(MemorySink::default()), 32);
        run(&mut c, |c| c.load_image(sample(3, 2)));

        let done = run(&mut c, |c| c.select_filter(FilterId::Golden));
        assert!(matches!(done.outcome, Outcome::Failed(EditError::RenderFailure(_))));
        assert_eq!(done.notice().as_deref(), Some("Error applying filter"));
        assert_eq!(c.session().selected_filter(), FilterId::Original);
        assert_eq!(c.history().len(), 1);

        let done = run(&mut c, |c| c.rotate(90.0));
        assert_eq!(done.notice().as_deref(), Some("Error rotating image"));
        assert_eq!(c.session().source().unwrap().width(), 3);
        assert!(!c.is_busy());
    }

    #[test]
    fn crop_keeps_filter_and_load_resets_everything() {
        let mut c = controller();
        run(&mut c, |c| c.load_image(sample(8, 8)));
        run(&mut c, |c| c.select_filter(FilterId::Sepia));

        let rect = CropRect {
            x: 0.0,
            y: 0.0,
            width: 0.5,
            height: 0.5,
        };
        let done = run(&mut c, |c| c.crop_with(&mut RectCrop::new(rect)));
        assert_eq!(done.operation, Operation::Crop);
        assert_eq!(c.session().selected_filter(), FilterId::Sepia);
        assert_eq!(c.displayed().unwrap().width(), 4);
        assert_eq!(c.history().len(), 3);

        run(&mut c, |c| c.load_image(sample(2, 2)));
        assert_eq!(c.session().selected_filter(), FilterId::Original);
        assert_eq!(c.history().len(), 1);
    }

    #[test]
    fn cropped_image_without_a_session_is_rejected() {
        let mut c = controller();
        assert_eq!(
            c.apply_crop(CropOutcome::Cropped(sample(2, 2))),
            Err(EditError::NoSourceImage)
        );
        assert!(!c.is_busy());
        assert!(c.history().is_empty());
        assert!(c.session().source().is_none());
    }

    #[test]
    fn cancelled_crop_is_a_no_op_and_failed_crop_is_surfaced() {
        let mut c = controller();
        run(&mut c, |c| c.load_image(sample(4, 4)));

        assert_eq!(c.crop_with(&mut RectCrop::dismissed()), Ok(None));
        let err = c.apply_crop(CropOutcome::Failed("disk full".into())).unwrap_err();
        assert_eq!(err, EditError::CropFailed("disk full".into()));
        assert_eq!(
            notice_for(Operation::Crop, &err),
            "Error cropping image: disk full"
        );
        assert_eq!(c.history().len(), 1);
        assert!(!c.is_busy());
    }

    #[test]
    fn save_persists_the_displayed_snapshot() {
        let sink = Arc::new(MemorySink::default());
        let mut c = EditController::new(Arc::new(CpuEngine), sink.clone(), 32);
        let img = sample(3, 3);
        run(&mut c, |c| c.load_image(img.clone()));
        run(&mut c, |c| c.select_filter(FilterId::BlackWhite));
        c.undo().unwrap();

        let done = run(&mut c, |c| c.save());
        assert!(matches!(done.outcome, Outcome::Saved(_)));
        assert_eq!(done.notice().as_deref(), Some("Image saved successfully"));
        let saved = sink.saved.lock().unwrap();
        assert_eq!(saved[0].to_rgba8(), img.to_rgba8());
    }

    #[test]
    fn slider_moves_are_absolute() {
        let mut c = controller();
        run(&mut c, |c| c.load_image(sample(3, 3)));
        run(&mut c, |c| c.set_brightness(70));
        let once = c.displayed().unwrap().clone();
        run(&mut c, |c| c.set_brightness(70));
        assert_eq!(c.displayed().unwrap().to_rgba8(), once.to_rgba8());
        assert_eq!(c.session().adjustments().brightness, 0.4);
    }
}
