use std::{mem, sync::Arc, thread, time::Instant};

use crossbeam_channel::{Receiver, Sender, unbounded};
use gpui::{
    AnyElement, App, AppContext, Context, IntoElement, ObjectFit, ParentElement, Render,
    RenderImage, SharedString, Styled, StyledImage, TitlebarOptions, Window, WindowOptions, div,
    img, px,
};
use gpui_component::{
    ActiveTheme, Root, StyledExt,
    button::{Button, ButtonVariants},
    h_flex,
    tag::Tag,
    v_flex,
};

use crate::{
    driver::CycleDriver,
    model_download::{ModelDownloadEvent, ModelKind, ensure_model_ready},
    pipeline::{
        CaptureSource, ModelPaths, OrtPerception, PerceptionConfig, open_default_camera,
    },
    types::{OverlayLabel, RenderedFrame},
};

mod download;
mod main_view;
mod render_util;
mod scheduler;

use render_util::{FitRect, contain_fit, frame_to_image, label_color};
use scheduler::CycleClock;

const WINDOW_TITLE: &str = "Smart Face Detection with Hand Gesture Control";
const HEADER_TITLE: &str = "🤖 Smart Face Detection Controlled by Hand Gestures";
const VIDEO_SIZE: (f32, f32) = (640.0, 480.0);
const LABEL_FONT_SIZE: f32 = 14.0;

type Driver = CycleDriver<Box<dyn CaptureSource>, OrtPerception>;

pub fn launch_ui(app: &mut App) -> gpui::Result<()> {
    let window_options = WindowOptions {
        titlebar: Some(TitlebarOptions {
            title: Some(WINDOW_TITLE.into()),
            ..Default::default()
        }),
        ..Default::default()
    };

    app.open_window(window_options, move |window, app| {
        let view = app.new(|_| AppView::new(ModelPaths::default(), PerceptionConfig::default()));
        app.new(|cx| Root::new(view, window, cx))
    })?;

    Ok(())
}

struct AppView {
    screen: Screen,
    download_rx: Receiver<DownloadMessage>,
    _download_handle: thread::JoinHandle<()>,
    driver: Option<Driver>,
    clock: CycleClock,
    latest_image: Option<Arc<RenderImage>>,
    latest_size: (u32, u32),
    latest_labels: Vec<OverlayLabel>,
}

enum Screen {
    Download(DownloadState),
    Failed(String),
    Main,
}

struct DownloadState {
    current: Option<ModelKind>,
    downloaded: u64,
    total: Option<u64>,
    message: String,
    error: Option<String>,
}

impl DownloadState {
    fn new() -> Self {
        Self {
            current: None,
            downloaded: 0,
            total: None,
            message: "Preparing models...".to_string(),
            error: None,
        }
    }
}

enum DownloadMessage {
    Event(ModelDownloadEvent),
    Ready(Box<OrtPerception>),
    Error(String),
}

impl AppView {
    fn new(paths: ModelPaths, config: PerceptionConfig) -> Self {
        let (download_tx, download_rx) = unbounded();
        let download_handle = download::spawn_model_setup(paths, config, download_tx);

        Self {
            screen: Screen::Download(DownloadState::new()),
            download_rx,
            _download_handle: download_handle,
            driver: None,
            clock: CycleClock::default(),
            latest_image: None,
            latest_size: (0, 0),
            latest_labels: Vec::new(),
        }
    }

    /// Opens the camera once perception is ready.
    fn attach_perception(&mut self, perception: OrtPerception) -> Screen {
        match open_default_camera() {
            Ok(capture) => {
                self.driver = Some(CycleDriver::new(capture, perception));
                Screen::Main
            }
            Err(err) => {
                log::error!("failed to open camera: {err:?}");
                Screen::Failed(format!("Could not open the camera: {err:#}"))
            }
        }
    }

    fn start_detection(&mut self) {
        if let Some(driver) = self.driver.as_mut() {
            if driver.start() {
                self.clock.reset();
            }
        }
    }

    fn stop_detection(&mut self) {
        if let Some(driver) = self.driver.as_mut() {
            driver.stop();
        }
    }

    fn exit_application(&mut self, window: &mut Window, cx: &mut Context<'_, Self>) {
        if let Some(driver) = self.driver.as_mut() {
            driver.exit();
        }
        if let Some(old_image) = self.latest_image.take() {
            cx.drop_image(old_image, Some(window));
        }
        cx.quit();
    }

    /// Runs a capture cycle when one is due and shows its result.
    fn drive_cycle(&mut self, window: &mut Window, cx: &mut Context<'_, Self>) {
        let Some(driver) = self.driver.as_mut() else {
            return;
        };
        if !driver.is_running() || !self.clock.tick(Instant::now()) {
            return;
        }
        if let Some(rendered) = driver.run_cycle() {
            self.show_frame(rendered, window, cx);
        }
    }

    fn show_frame(&mut self, rendered: RenderedFrame, window: &mut Window, cx: &mut Context<'_, Self>) {
        let Some(image) = frame_to_image(&rendered.frame) else {
            log::warn!(
                "dropping malformed frame {}x{}",
                rendered.frame.width,
                rendered.frame.height
            );
            return;
        };
        if let Some(old_image) = self.latest_image.replace(image) {
            // Explicitly drop the previous GPU texture; otherwise the sprite atlas keeps
            // every frame and memory will climb rapidly while the camera is running.
            cx.drop_image(old_image, Some(window));
        }
        self.latest_size = (rendered.frame.width, rendered.frame.height);
        self.latest_labels = rendered.labels;
    }
}

impl Render for AppView {
    fn render(
        &mut self,
        window: &mut Window,
        cx: &mut Context<'_, Self>,
    ) -> impl gpui::IntoElement {
        cx.defer_in(window, |_, _, cx| {
            cx.notify();
        });

        let mut screen = mem::replace(&mut self.screen, Screen::Main);
        let view = match screen {
            Screen::Download(mut state) => {
                let ready = self.poll_download_events(&mut state);
                let view = self.render_download_view(&state, cx);
                screen = match ready {
                    Some(perception) => self.attach_perception(perception),
                    None => Screen::Download(state),
                };
                view
            }
            Screen::Failed(message) => {
                let view = self.render_failure(&message, cx);
                screen = Screen::Failed(message);
                view
            }
            Screen::Main => {
                self.drive_cycle(window, cx);
                screen = Screen::Main;
                self.render_main(cx)
            }
        };
        self.screen = screen;
        view
    }
}
