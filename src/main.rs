use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use winit::application::ApplicationHandler;
use winit::dpi::LogicalSize;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop, EventLoopProxy};
use winit::keyboard::Key;
use winit::window::{Window, WindowAttributes, WindowId};

use audio_visualizer::audio::CpalPlayer;
use audio_visualizer::cli::{Args, RendererKind};
use audio_visualizer::driver::DriverState;
use audio_visualizer::render::{self, GpuContext, Visualization, CANVAS_HEIGHT, CANVAS_WIDTH};
use audio_visualizer::visualizer::{LoadOutcome, Visualizer};

/// Events delivered to the UI thread from worker threads.
enum AppEvent {
    /// A file finished decoding.
    Loaded(LoadOutcome),
}

struct App {
    window: Option<Arc<Window>>,
    renderer: Option<Box<dyn Visualization>>,
    visualizer: Visualizer<CpalPlayer>,
    renderer_kind: RendererKind,
    initial_file: Option<PathBuf>,
    proxy: EventLoopProxy<AppEvent>,
}

impl App {
    fn new(args: Args, visualizer: Visualizer<CpalPlayer>, proxy: EventLoopProxy<AppEvent>) -> Self {
        Self {
            window: None,
            renderer: None,
            visualizer,
            renderer_kind: args.renderer,
            initial_file: args.file,
            proxy,
        }
    }

    /// A new file selection. Decoding runs on a worker thread and reports
    /// back through `AppEvent::Loaded`.
    fn select(&mut self, file: Option<PathBuf>) {
        let Some(request) = self.visualizer.select_file(file.as_deref()) else {
            return;
        };

        let proxy = self.proxy.clone();
        std::thread::spawn(move || {
            let outcome = request.run();
            if proxy.send_event(AppEvent::Loaded(outcome)).is_err() {
                log::debug!("Event loop closed before decode finished");
            }
        });

        if let Some(w) = &self.window {
            w.request_redraw();
        }
    }

    fn pick_file(&mut self) {
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("MP3 audio", &["mp3"])
            .pick_file()
        {
            self.select(Some(path));
        }
    }
}

fn notify_graphics_failure(err: &render::RenderError) {
    log::error!("Graphics initialisation failed: {err}");
    rfd::MessageDialog::new()
        .set_level(rfd::MessageLevel::Error)
        .set_title("Audio Visualizer")
        .set_description(format!("This system cannot draw the visualizer.\n\n{err}"))
        .set_buttons(rfd::MessageButtons::Ok)
        .show();
}

impl ApplicationHandler<AppEvent> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        // Only initialise once
        if self.window.is_some() {
            return;
        }

        let attrs = WindowAttributes::default()
            .with_title("Audio Visualizer")
            .with_inner_size(LogicalSize::new(CANVAS_WIDTH, CANVAS_HEIGHT))
            .with_resizable(false);

        let window = match event_loop.create_window(attrs) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("Failed to create window: {e}");
                event_loop.exit();
                return;
            }
        };

        let gpu = match pollster::block_on(GpuContext::new(window.clone())) {
            Ok(gpu) => gpu,
            Err(e) => {
                notify_graphics_failure(&e);
                event_loop.exit();
                return;
            }
        };

        match render::build(self.renderer_kind, gpu, self.visualizer.bin_count()) {
            Ok(renderer) => self.renderer = Some(renderer),
            Err(e) if e.is_graphics_init_failure() => {
                notify_graphics_failure(&e);
                event_loop.exit();
                return;
            }
            // Already logged; keep playing audio without a picture
            Err(_) => {}
        }

        self.window = Some(window);

        if let Some(path) = self.initial_file.take() {
            self.select(Some(path));
        }
    }

    fn user_event(&mut self, _event_loop: &ActiveEventLoop, event: AppEvent) {
        match event {
            AppEvent::Loaded(outcome) => self.visualizer.finish_load(outcome),
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                event_loop.exit();
            }

            WindowEvent::Resized(size) => {
                if let Some(r) = &mut self.renderer {
                    r.resize(size);
                }
            }

            WindowEvent::DroppedFile(path) => {
                self.select(Some(path));
            }

            WindowEvent::KeyboardInput { event, .. }
                if event.state == ElementState::Pressed && !event.repeat =>
            {
                if let Key::Character(c) = &event.logical_key {
                    if c.eq_ignore_ascii_case("o") {
                        self.pick_file();
                    }
                }
            }

            WindowEvent::RedrawRequested => {
                if let Some(r) = &mut self.renderer {
                    // Idle windows still need a frame when the OS exposes them
                    if !self.visualizer.tick(r.as_mut()) {
                        self.visualizer.redraw(r.as_mut());
                    }
                }
            }

            _ => {}
        }
    }

    /// Called after all pending events have been processed.
    /// While a frame is scheduled, keep requesting redraws (~vsync rate).
    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if self.renderer.is_none() || self.visualizer.driver_state() != DriverState::Running {
            return;
        }
        if let Some(w) = &self.window {
            w.request_redraw();
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args = Args::parse();
    log::info!("Renderer: {:?}", args.renderer);

    let event_loop = EventLoop::<AppEvent>::with_user_event()
        .build()
        .context("Failed to create event loop")?;

    let visualizer = Visualizer::new(CpalPlayer::new(), args.renderer.window_size())
        .context("Failed to create spectrum analyzer")?;

    // Create a new app and hand it the file picked on the command line
    let mut app = App::new(args, visualizer, event_loop.create_proxy());
    event_loop.run_app(&mut app).context("Event loop error")?;
    Ok(())
}
