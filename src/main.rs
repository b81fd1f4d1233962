use aimtrack_config::AppConfig;
use aimtrack_input::mouse::{InteractionManager, Target};
use aimtrack_input::viewport::{PlotRect, Viewport2D};
use aimtrack_input::ViewAction;
use aimtrack_scene::grid::grid_lines;
use aimtrack_scene::session::{Playback, SessionRecord, SessionReview};
use aimtrack_scene::{LiveScene, LiveSettings};
use aimtrack_sensors::orientation::ReplayResolver;
use aimtrack_sensors::stability::session_profile;
use aimtrack_sensors::FeedClient;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use glam::DVec2;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

#[derive(Parser)]
#[command(name = "aimtrack", about = "Rifle orientation and balance board trainer")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Follow the sensor bridge live.
    Live {
        /// Bridge address, overriding the config file.
        #[arg(long)]
        address: Option<String>,
    },
    /// Review a recorded shot.
    Replay {
        /// Session record (JSON).
        file: PathBuf,
        /// Shot numbers to compare against the reviewed one.
        #[arg(long, value_delimiter = ',')]
        compare: Vec<usize>,
    },
}

fn plot_rect(layout: &aimtrack_config::PlotLayout, width: f64, height: f64) -> PlotRect {
    let (x, y, w, h) = layout.resolve(width, height);
    PlotRect::new(x, y, w, h)
}

/// Live application state.
struct App {
    config: AppConfig,
    feed: FeedClient,
    window: Option<Arc<Window>>,
    scene: LiveScene,
    interaction: InteractionManager,
    frame_interval: Duration,
    stability_interval: Duration,
    next_frame: Instant,
    next_stability: Instant,
    frame_count: u64,
}

impl App {
    fn new(config: AppConfig, feed: FeedClient) -> Self {
        let view = &config.view;
        let plot = plot_rect(&config.board.live_plot, view.canvas_width, view.canvas_height);

        let scene = LiveScene::new(LiveSettings {
            sensitivity: config.orientation.sensitivity,
            stability_sensitivity: config.orientation.stability_sensitivity,
            trail_length: config.board.trail_length,
            stability_slots: config.orientation.stability_history,
            indicator_canvas: DVec2::new(view.canvas_width, view.canvas_height),
            plot,
        });
        let interaction = InteractionManager::new(
            Viewport2D::new(view.canvas_width, view.canvas_height).with_zoom_step(view.zoom_step),
        )
        .with_hit_radius(view.hit_radius);

        let frame_interval = Duration::from_secs_f64(1.0 / f64::from(view.frame_rate_hz));
        let stability_interval = Duration::from_millis(config.orientation.stability_interval_ms);
        let now = Instant::now();

        Self {
            config,
            feed,
            window: None,
            scene,
            interaction,
            frame_interval,
            stability_interval,
            next_frame: now,
            next_stability: now,
            frame_count: 0,
        }
    }

    fn push_parameters(&mut self) {
        self.config.orientation.sensitivity = self.scene.settings().sensitivity;
        self.config.orientation.stability_sensitivity = self.scene.settings().stability_sensitivity;
        self.feed.set_parameters(self.scene.parameters());
    }

    fn adjust_sensitivity(&mut self, delta: f64) {
        let range = self.config.orientation.sensitivity_range;
        let value = range.clamp(self.scene.settings().sensitivity + delta);
        self.scene.set_sensitivity(value);
        self.push_parameters();
        info!(sensitivity = value, "Sensitivity changed");
    }

    fn adjust_stability_sensitivity(&mut self, delta: f64) {
        let range = self.config.orientation.stability_sensitivity_range;
        let value = range.clamp(self.scene.settings().stability_sensitivity + delta);
        self.scene.set_stability_sensitivity(value);
        self.push_parameters();
        info!(stability_sensitivity = value, "Stability sensitivity changed");
    }

    fn apply_view_action(&self, action: ViewAction) {
        match action {
            ViewAction::Zoom { scale, origin } => {
                tracing::trace!(scale, x = origin.x, y = origin.y, "View zoomed");
            }
            ViewAction::Pan(origin) => {
                tracing::trace!(x = origin.x, y = origin.y, "View panned");
            }
            ViewAction::Hover(index) => {
                tracing::trace!(?index, "Hover changed");
            }
            ViewAction::Select(index) => {
                info!(index, "Shot point selected");
            }
        }
    }

    fn render_frame(&mut self) {
        let snapshot = self.feed.frame();
        let frame = self.scene.update(snapshot, &self.interaction);

        // Shot markers are the pointer targets of the live board.
        let targets = frame
            .shots
            .iter()
            .map(|s| Target::new(s.position))
            .collect();
        self.interaction.set_targets(targets);

        self.frame_count += 1;
        if self.frame_count % 300 == 0 {
            tracing::debug!(
                frames = self.frame_count,
                yaw = frame.angles.yaw,
                pitch = frame.angles.pitch,
                roll = frame.angles.roll,
                shots = frame.shots.len(),
                scale = frame.viewport.scale,
                feed_closed = self.feed.is_closed(),
                "Frame heartbeat"
            );
        }

        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let size = PhysicalSize::new(
            self.config.view.canvas_width as u32,
            self.config.view.canvas_height as u32,
        );
        let attrs = Window::default_attributes()
            .with_title("aimtrack")
            .with_inner_size(size);

        match event_loop.create_window(attrs) {
            Ok(window) => {
                self.window = Some(Arc::new(window));
                self.feed.set_parameters(self.scene.parameters());
                info!(
                    width = size.width,
                    height = size.height,
                    "Live view initialized"
                );
            }
            Err(e) => {
                error!(?e, "Failed to create window");
                event_loop.exit();
            }
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
                if let Err(e) = aimtrack_config::save_config(&self.config) {
                    error!(?e, "Failed to save config");
                }
                event_loop.exit();
            }

            WindowEvent::Resized(size) => {
                if size.width > 0 && size.height > 0 {
                    let (w, h) = (f64::from(size.width), f64::from(size.height));
                    self.interaction.on_resized(w, h);
                    self.scene.resize_indicators(w, h);
                    self.scene
                        .set_plot(plot_rect(&self.config.board.live_plot, w, h));
                }
            }

            WindowEvent::KeyboardInput { event, .. } => {
                if event.state == ElementState::Pressed {
                    match event.physical_key {
                        PhysicalKey::Code(KeyCode::F5) => {
                            self.scene.calibrate_orientation();
                            self.push_parameters();
                        }
                        PhysicalKey::Code(KeyCode::F6) => {
                            self.scene.calibrate_position();
                            self.push_parameters();
                        }
                        PhysicalKey::Code(KeyCode::KeyC) => {
                            self.scene.clear_shots();
                            info!("Shot points cleared");
                        }
                        PhysicalKey::Code(KeyCode::ArrowUp) => self.adjust_sensitivity(1.0),
                        PhysicalKey::Code(KeyCode::ArrowDown) => self.adjust_sensitivity(-1.0),
                        PhysicalKey::Code(KeyCode::ArrowRight) => {
                            self.adjust_stability_sensitivity(10.0)
                        }
                        PhysicalKey::Code(KeyCode::ArrowLeft) => {
                            self.adjust_stability_sensitivity(-10.0)
                        }
                        PhysicalKey::Code(KeyCode::Escape) => {
                            event_loop.exit();
                        }
                        _ => {}
                    }
                }
            }

            WindowEvent::CursorMoved { position, .. } => {
                if let Some(action) = self.interaction.on_cursor_moved(position.x, position.y) {
                    self.apply_view_action(action);
                }
            }

            WindowEvent::MouseInput { button, state, .. } => {
                if let Some(action) = self.interaction.on_mouse_button(button, state) {
                    self.apply_view_action(action);
                }
            }

            WindowEvent::MouseWheel { delta, .. } => {
                if let Some(action) = self.interaction.on_scroll(delta) {
                    self.apply_view_action(action);
                }
            }

            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        let now = Instant::now();

        if now >= self.next_stability {
            self.scene.sample_stability();
            self.next_stability = now + self.stability_interval;
        }
        if now >= self.next_frame {
            self.render_frame();
            self.next_frame = now + self.frame_interval;
        }

        event_loop.set_control_flow(ControlFlow::WaitUntil(
            self.next_frame.min(self.next_stability),
        ));
    }
}

async fn run_live(config: AppConfig, address: Option<String>) -> Result<()> {
    let address = address.unwrap_or_else(|| config.feed.address.clone());
    let send_interval = Duration::from_millis(config.feed.send_interval_ms);

    // Fall back to a mock feed so the view can still be driven without the rig.
    let initial = aimtrack_sensors::protocol::ControlParameters::default();
    let feed = match FeedClient::connect(&address, initial, send_interval).await {
        Ok(client) => {
            info!(%address, "Sensor bridge connected");
            client
        }
        Err(e) => {
            warn!(?e, %address, "Sensor bridge not available, using mock feed");
            FeedClient::mock()
        }
    };

    let event_loop = EventLoop::new()?;
    let mut app = App::new(config, feed);
    event_loop.run_app(&mut app)?;

    Ok(())
}

fn run_replay(config: &AppConfig, file: PathBuf, compare: &[usize]) -> Result<()> {
    let record = SessionRecord::load(&file)
        .with_context(|| format!("loading session {}", file.display()))?;

    let sensitivity = config.orientation.sensitivity;
    let mut resolver = ReplayResolver::new();
    let mut playback = Playback::new(record.len());

    // Walk the whole recording once, as playback would.
    playback.play();
    let mut peak = [0.0f64; 3];
    for _ in 0..record.len() {
        let index = playback.tick();
        let Some(q) = record.quaternion(index) else {
            continue;
        };
        let angles = resolver.resolve(q, None, sensitivity);
        if !angles.is_finite() {
            tracing::trace!(index, "Skipping non-finite sample");
            continue;
        }
        peak[0] = peak[0].max(angles.yaw.abs());
        peak[1] = peak[1].max(angles.pitch.abs());
        peak[2] = peak[2].max(angles.roll.abs());
    }
    playback.pause();
    playback.jump_to_shot();

    let shot_index = playback.index();
    if let Some(q) = record.quaternion(shot_index) {
        let at_shot = resolver.resolve(q, None, sensitivity);
        info!(
            index = shot_index,
            yaw = at_shot.yaw,
            pitch = at_shot.pitch,
            roll = at_shot.roll,
            "Orientation at shot"
        );
    }
    info!(
        yaw = peak[0],
        pitch = peak[1],
        roll = peak[2],
        "Peak deviation over recording"
    );

    let profile = session_profile(
        &record.quaternions(),
        config.orientation.stability_history,
        config.orientation.stability_sensitivity,
    );
    let steadiest = profile
        .iter()
        .copied()
        .enumerate()
        .min_by(|a, b| a.1.total_cmp(&b.1));
    let total: f64 = profile.iter().sum();
    info!(buckets = profile.len(), total, ?steadiest, "Stability profile");

    let view = &config.view;
    let rect = plot_rect(&config.board.review_plot, view.canvas_width, view.canvas_height);
    let grid = grid_lines(&rect, config.board.square_size);
    tracing::debug!(
        horizontal = grid.horizontal.len(),
        vertical = grid.vertical.len(),
        "Review grid"
    );

    let mut review = SessionReview::new(&record, rect, view.hit_radius);
    for &number in compare {
        let Some(index) = review.index_for_number(number) else {
            warn!(number, "Shot cannot be compared");
            continue;
        };
        match record.tail_for(index) {
            Some(tail) => {
                review.compare(index, tail);
            }
            None => warn!(number, "Session carries no trace for shot"),
        }
    }

    for shot in review.compared() {
        let marker = shot.tail.marker().map(|m| rect.domain_to_screen(m));
        info!(number = shot.number, samples = shot.tail.len(), ?marker, "Compared shot");
    }
    info!(
        session_id = ?record.session_id,
        shot_id = record.shot_id,
        points = review.point_positions().len(),
        compared = review.compared().len(),
        "Review ready"
    );

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "aimtrack_app=info,aimtrack_sensors=info,aimtrack_scene=info,aimtrack_config=info"
                    .into()
            }),
        )
        .init();

    let cli = Cli::parse();
    info!("aimtrack starting");

    let config = aimtrack_config::load_config().unwrap_or_else(|e| {
        warn!(?e, "Failed to load config, using defaults");
        AppConfig::default()
    });

    info!(
        sensitivity = config.orientation.sensitivity,
        address = %config.feed.address,
        "Config loaded"
    );

    match cli.command {
        Command::Live { address } => run_live(config, address).await,
        Command::Replay { file, compare } => run_replay(&config, file, &compare),
    }
}
