use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use pixels::Error as PixelsError;
use thiserror::Error;
use tracing::{info, warn};
use winit::dpi::LogicalSize;
use winit::error::{EventLoopError, OsError};
use winit::event::{ElementState, Event, KeyEvent, MouseButton, MouseScrollDelta, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::PhysicalKey;
use winit::window::WindowBuilder;

use crate::world::Vec2;

use super::input::{actions_for_key, ActionStates};
use super::metrics::MetricsAccumulator;
use super::{Canvas, InputAction, InputSnapshot, Renderer, Scene, SceneCommand};

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub window_title: String,
    pub window_width: u32,
    pub window_height: u32,
    pub logical_width: u32,
    pub logical_height: u32,
    pub target_tps: u32,
    pub max_frame_delta: Duration,
    pub max_ticks_per_frame: u32,
    pub metrics_log_interval: Duration,
    pub max_render_fps: Option<u32>,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            window_title: "Ninja".to_string(),
            window_width: 640,
            window_height: 480,
            logical_width: 320,
            logical_height: 240,
            target_tps: 60,
            max_frame_delta: Duration::from_millis(250),
            max_ticks_per_frame: 5,
            metrics_log_interval: Duration::from_secs(1),
            max_render_fps: Some(60),
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to create event loop: {0}")]
    CreateEventLoop(#[source] EventLoopError),
    #[error("failed to create application window: {0}")]
    CreateWindow(#[source] OsError),
    #[error("failed to initialize renderer: {0}")]
    CreateRenderer(#[source] PixelsError),
    #[error("event loop failed: {0}")]
    EventLoopRun(#[source] EventLoopError),
}

/// Opens the window and drives `scene` at a fixed tick rate until it exits or the
/// window closes.
pub fn run_app(config: LoopConfig, mut scene: Box<dyn Scene>) -> Result<(), AppError> {
    let event_loop = EventLoop::new().map_err(AppError::CreateEventLoop)?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(config.window_title.clone())
            .with_inner_size(LogicalSize::new(
                config.window_width as f64,
                config.window_height as f64,
            ))
            .build(&event_loop)
            .map_err(AppError::CreateWindow)?,
    );
    let logical_width = config.logical_width.max(1);
    let logical_height = config.logical_height.max(1);
    let mut renderer = Renderer::new(Arc::clone(&window), logical_width, logical_height)
        .map_err(AppError::CreateRenderer)?;
    let mut canvas = Canvas::new(logical_width, logical_height);

    event_loop.set_control_flow(ControlFlow::Poll);

    let target_tps = config.target_tps.max(1);
    let max_frame_delta =
        normalize_non_zero_duration(config.max_frame_delta, Duration::from_millis(250));
    let max_ticks_per_frame = config.max_ticks_per_frame.max(1);
    let metrics_log_interval =
        normalize_non_zero_duration(config.metrics_log_interval, Duration::from_secs(1));
    let fixed_dt = Duration::from_secs_f64(1.0 / target_tps as f64);
    let render_cap = normalize_render_fps_cap(config.max_render_fps);
    let render_frame_target = target_frame_duration(render_cap);
    let mut input_collector = InputCollector::default();

    scene.load();
    info!(
        target_tps,
        logical_width,
        logical_height,
        max_frame_delta_ms = max_frame_delta.as_millis() as u64,
        max_ticks_per_frame,
        render_fps_cap = %format_render_cap(render_cap),
        "loop_config"
    );

    let mut accumulator = Duration::ZERO;
    let mut last_frame_instant = Instant::now();
    let mut last_present_instant = Instant::now();
    let mut metrics = MetricsAccumulator::new(metrics_log_interval);
    let mut last_applied_title: Option<String> = None;

    event_loop
        .run(move |event, window_target| match event {
            Event::WindowEvent { window_id, event } if window_id == window.id() => match event {
                WindowEvent::CloseRequested => {
                    input_collector.mark_quit_requested();
                    info!(reason = "window_close", "shutdown_requested");
                    window_target.exit();
                }
                WindowEvent::Resized(new_size) => {
                    if let Err(error) = renderer.resize(new_size.width, new_size.height) {
                        warn!(error = %error, "renderer_resize_failed");
                        window_target.exit();
                    }
                }
                WindowEvent::ScaleFactorChanged { .. } => {
                    let size = window.inner_size();
                    if let Err(error) = renderer.resize(size.width, size.height) {
                        warn!(error = %error, "renderer_resize_failed");
                        window_target.exit();
                    }
                }
                WindowEvent::CursorMoved { position, .. } => {
                    let logical = renderer.window_to_logical(position.x, position.y);
                    input_collector.set_cursor_position(logical);
                }
                WindowEvent::CursorLeft { .. } => {
                    input_collector.clear_cursor_position();
                }
                WindowEvent::MouseInput { state, button, .. } => {
                    input_collector.handle_mouse_input(button, state);
                }
                WindowEvent::MouseWheel { delta, .. } => {
                    input_collector.handle_mouse_wheel(delta);
                }
                WindowEvent::KeyboardInput { event, .. } => {
                    input_collector.handle_keyboard_input(&event);
                    if input_collector.quit_requested {
                        info!(reason = "escape_key", "shutdown_requested");
                        window_target.exit();
                    }
                }
                WindowEvent::RedrawRequested => {
                    let now = Instant::now();
                    let raw_frame_dt = now.saturating_duration_since(last_frame_instant);
                    last_frame_instant = now;

                    accumulator =
                        accumulator.saturating_add(clamp_frame_delta(raw_frame_dt, max_frame_delta));
                    let step_plan = plan_sim_steps(accumulator, fixed_dt, max_ticks_per_frame);
                    for _ in 0..step_plan.ticks_to_run {
                        let input = input_collector.snapshot_for_tick();
                        if scene.update(&input) == SceneCommand::Exit {
                            info!(reason = "scene_exit", "shutdown_requested");
                            window_target.exit();
                            break;
                        }
                    }
                    metrics.record_ticks(step_plan.ticks_to_run);
                    accumulator = step_plan.remaining_accumulator;

                    if step_plan.dropped_backlog > Duration::ZERO {
                        warn!(
                            dropped_backlog_ms = step_plan.dropped_backlog.as_millis() as u64,
                            max_ticks_per_frame, "sim_clamp_triggered"
                        );
                    }

                    let elapsed_since_present =
                        Instant::now().saturating_duration_since(last_present_instant);
                    let cap_sleep = compute_cap_sleep(elapsed_since_present, render_frame_target);
                    if cap_sleep > Duration::ZERO {
                        thread::sleep(cap_sleep);
                    }

                    scene.render(&mut canvas);
                    if let Err(error) = renderer.present(&canvas) {
                        warn!(error = %error, "renderer_draw_failed");
                        window_target.exit();
                    }
                    last_present_instant = Instant::now();

                    let next_title = scene.debug_title();
                    if next_title != last_applied_title {
                        window.set_title(next_title.as_deref().unwrap_or(&config.window_title));
                        last_applied_title = next_title;
                    }

                    metrics.record_frame(raw_frame_dt);
                    if let Some(snapshot) = metrics.take_if_due(now) {
                        info!(
                            fps = snapshot.fps,
                            tps = snapshot.tps,
                            frame_time_ms = snapshot.frame_time_ms,
                            "loop_metrics"
                        );
                    }
                }
                _ => {}
            },
            Event::AboutToWait => {
                window.request_redraw();
            }
            Event::LoopExiting => {
                scene.unload();
                info!("shutdown");
            }
            _ => {}
        })
        .map_err(AppError::EventLoopRun)
}

/// Accumulates window events between ticks and hands out one [`InputSnapshot`] per tick.
#[derive(Debug, Default)]
struct InputCollector {
    quit_requested: bool,
    held: ActionStates,
    pressed_edges: ActionStates,
    cursor_position: Option<Vec2>,
    left_mouse_is_down: bool,
    left_click_pressed_edge: bool,
    right_mouse_is_down: bool,
    pending_wheel_steps: i32,
}

impl InputCollector {
    fn mark_quit_requested(&mut self) {
        self.quit_requested = true;
    }

    fn handle_keyboard_input(&mut self, key_event: &KeyEvent) {
        self.handle_key(key_event.physical_key, key_event.state);
    }

    fn handle_key(&mut self, key: PhysicalKey, state: ElementState) {
        for &action in actions_for_key(key) {
            self.handle_action_state(action, state);
        }
    }

    fn handle_action_state(&mut self, action: InputAction, state: ElementState) {
        match state {
            ElementState::Pressed => {
                if !self.held.is_down(action) {
                    self.pressed_edges.set(action, true);
                }
                self.held.set(action, true);
                if action == InputAction::Quit {
                    self.mark_quit_requested();
                }
            }
            ElementState::Released => self.held.set(action, false),
        }
    }

    fn snapshot_for_tick(&mut self) -> InputSnapshot {
        let snapshot = InputSnapshot::new(
            self.quit_requested,
            self.held,
            self.pressed_edges,
            self.cursor_position,
            self.left_mouse_is_down,
            self.right_mouse_is_down,
            self.left_click_pressed_edge,
            self.pending_wheel_steps,
        );
        self.pressed_edges = ActionStates::default();
        self.left_click_pressed_edge = false;
        self.pending_wheel_steps = 0;
        snapshot
    }

    fn set_cursor_position(&mut self, position: Vec2) {
        self.cursor_position = Some(position);
    }

    fn clear_cursor_position(&mut self) {
        self.cursor_position = None;
    }

    fn handle_mouse_wheel(&mut self, delta: MouseScrollDelta) {
        let steps = wheel_steps_from_scroll_delta(delta);
        self.pending_wheel_steps = self.pending_wheel_steps.saturating_add(steps);
    }

    /// Left reports a press edge for single clicks; right is only ever held.
    fn handle_mouse_input(&mut self, button: MouseButton, state: ElementState) {
        let pressed = state == ElementState::Pressed;
        match button {
            MouseButton::Left => {
                if pressed && !self.left_mouse_is_down {
                    self.left_click_pressed_edge = true;
                }
                self.left_mouse_is_down = pressed;
            }
            MouseButton::Right => self.right_mouse_is_down = pressed,
            _ => {}
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct StepPlan {
    ticks_to_run: u32,
    remaining_accumulator: Duration,
    dropped_backlog: Duration,
}

fn plan_sim_steps(
    mut accumulator: Duration,
    fixed_dt: Duration,
    max_ticks_per_frame: u32,
) -> StepPlan {
    let mut ticks_to_run = 0u32;
    while accumulator >= fixed_dt && ticks_to_run < max_ticks_per_frame {
        accumulator = accumulator.saturating_sub(fixed_dt);
        ticks_to_run = ticks_to_run.saturating_add(1);
    }

    let dropped_backlog = if accumulator >= fixed_dt {
        std::mem::take(&mut accumulator)
    } else {
        Duration::ZERO
    };
    StepPlan {
        ticks_to_run,
        remaining_accumulator: accumulator,
        dropped_backlog,
    }
}

fn clamp_frame_delta(frame_dt: Duration, max_frame_delta: Duration) -> Duration {
    frame_dt.min(max_frame_delta)
}

fn normalize_non_zero_duration(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}

fn normalize_render_fps_cap(cap: Option<u32>) -> Option<u32> {
    cap.filter(|value| *value > 0)
}

fn target_frame_duration(max_render_fps: Option<u32>) -> Option<Duration> {
    max_render_fps.map(|fps| Duration::from_secs_f64(1.0 / fps as f64))
}

fn compute_cap_sleep(elapsed: Duration, target: Option<Duration>) -> Duration {
    match target {
        Some(frame_target) if elapsed < frame_target => frame_target - elapsed,
        _ => Duration::ZERO,
    }
}

fn format_render_cap(cap: Option<u32>) -> String {
    match cap {
        Some(value) => value.to_string(),
        None => "off".to_string(),
    }
}

fn wheel_steps_from_scroll_delta(delta: MouseScrollDelta) -> i32 {
    match delta {
        MouseScrollDelta::LineDelta(_, y) => y.round() as i32,
        MouseScrollDelta::PixelDelta(position) => {
            if position.y > 0.0 {
                1
            } else if position.y < 0.0 {
                -1
            } else {
                0
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use winit::keyboard::KeyCode;

    fn key(code: KeyCode) -> PhysicalKey {
        PhysicalKey::Code(code)
    }

    #[test]
    fn clamp_frame_delta_caps_large_frame() {
        let max_frame_delta = Duration::from_millis(250);
        assert_eq!(
            clamp_frame_delta(Duration::from_millis(600), max_frame_delta),
            max_frame_delta
        );
    }

    #[test]
    fn plan_sim_steps_runs_expected_ticks_without_drop() {
        let result = plan_sim_steps(Duration::from_millis(50), Duration::from_millis(16), 5);
        assert_eq!(result.ticks_to_run, 3);
        assert_eq!(result.remaining_accumulator, Duration::from_millis(2));
        assert_eq!(result.dropped_backlog, Duration::ZERO);
    }

    #[test]
    fn plan_sim_steps_drops_backlog_when_tick_cap_hit() {
        let result = plan_sim_steps(Duration::from_millis(120), Duration::from_millis(16), 3);
        assert_eq!(result.ticks_to_run, 3);
        assert_eq!(result.remaining_accumulator, Duration::ZERO);
        assert_eq!(result.dropped_backlog, Duration::from_millis(72));
    }

    #[test]
    fn key_press_edge_lasts_one_tick_while_held_state_persists() {
        let mut input = InputCollector::default();
        input.handle_key(key(KeyCode::KeyG), ElementState::Pressed);

        let first = input.snapshot_for_tick();
        let second = input.snapshot_for_tick();

        assert!(first.was_pressed(InputAction::ToggleGrid));
        assert!(first.is_down(InputAction::ToggleGrid));
        assert!(!second.was_pressed(InputAction::ToggleGrid));
        assert!(second.is_down(InputAction::ToggleGrid));
    }

    #[test]
    fn key_repeat_does_not_retrigger_until_release() {
        let mut input = InputCollector::default();
        input.handle_key(key(KeyCode::KeyT), ElementState::Pressed);
        assert!(input.snapshot_for_tick().was_pressed(InputAction::Autotile));

        input.handle_key(key(KeyCode::KeyT), ElementState::Pressed);
        assert!(!input.snapshot_for_tick().was_pressed(InputAction::Autotile));

        input.handle_key(key(KeyCode::KeyT), ElementState::Released);
        input.handle_key(key(KeyCode::KeyT), ElementState::Pressed);
        assert!(input.snapshot_for_tick().was_pressed(InputAction::Autotile));
    }

    #[test]
    fn movement_keys_map_to_held_actions() {
        let mut input = InputCollector::default();
        input.handle_key(key(KeyCode::KeyA), ElementState::Pressed);
        input.handle_key(key(KeyCode::ArrowDown), ElementState::Pressed);

        let snapshot = input.snapshot_for_tick();
        assert!(snapshot.is_down(InputAction::MoveLeft));
        assert!(snapshot.is_down(InputAction::MoveDown));

        input.handle_key(key(KeyCode::KeyA), ElementState::Released);
        assert!(!input.snapshot_for_tick().is_down(InputAction::MoveLeft));
    }

    #[test]
    fn escape_requests_quit() {
        let mut input = InputCollector::default();
        input.handle_key(key(KeyCode::Escape), ElementState::Pressed);
        assert!(input.quit_requested);
        assert!(input.snapshot_for_tick().quit_requested());
    }

    #[test]
    fn mouse_buttons_report_held_state_and_single_tick_edges() {
        let mut input = InputCollector::default();
        input.handle_mouse_input(MouseButton::Left, ElementState::Pressed);
        input.handle_mouse_input(MouseButton::Right, ElementState::Pressed);

        let first = input.snapshot_for_tick();
        input.handle_mouse_input(MouseButton::Left, ElementState::Pressed);
        let second = input.snapshot_for_tick();
        input.handle_mouse_input(MouseButton::Left, ElementState::Released);
        let third = input.snapshot_for_tick();

        assert!(first.left_click_pressed() && first.left_mouse_down());
        assert!(first.right_mouse_down());
        assert!(!second.left_click_pressed() && second.left_mouse_down());
        assert!(!third.left_mouse_down());
        assert!(third.right_mouse_down());
    }

    #[test]
    fn snapshot_carries_cursor_until_it_leaves() {
        let mut input = InputCollector::default();
        input.set_cursor_position(Vec2::new(100.0, 50.0));
        assert_eq!(
            input.snapshot_for_tick().cursor_position(),
            Some(Vec2::new(100.0, 50.0))
        );
        input.clear_cursor_position();
        assert_eq!(input.snapshot_for_tick().cursor_position(), None);
    }

    #[test]
    fn wheel_steps_accumulate_and_reset_per_tick() {
        let mut input = InputCollector::default();
        input.handle_mouse_wheel(MouseScrollDelta::LineDelta(0.0, 1.0));
        input.handle_mouse_wheel(MouseScrollDelta::LineDelta(0.0, -3.0));

        assert_eq!(input.snapshot_for_tick().wheel_steps(), -2);
        assert_eq!(input.snapshot_for_tick().wheel_steps(), 0);
    }

    #[test]
    fn pixel_wheel_delta_maps_to_single_step_direction() {
        let step = |y| {
            wheel_steps_from_scroll_delta(MouseScrollDelta::PixelDelta(
                winit::dpi::PhysicalPosition::new(0.0, y),
            ))
        };
        assert_eq!(step(3.0), 1);
        assert_eq!(step(-5.0), -1);
        assert_eq!(step(0.0), 0);
    }

    #[test]
    fn render_cap_helpers() {
        assert_eq!(normalize_render_fps_cap(Some(0)), None);
        assert_eq!(target_frame_duration(None), None);
        let target = target_frame_duration(Some(60)).expect("target");
        assert!((target.as_secs_f64() - 1.0 / 60.0).abs() < 1e-6);
        assert_eq!(compute_cap_sleep(Duration::from_millis(20), Some(target)), Duration::ZERO);
        assert!(compute_cap_sleep(Duration::from_millis(5), Some(target)) > Duration::ZERO);
    }

    #[test]
    fn default_config_matches_window_and_logical_resolution() {
        let config = LoopConfig::default();
        assert_eq!((config.window_width, config.window_height), (640, 480));
        assert_eq!((config.logical_width, config.logical_height), (320, 240));
        assert_eq!(config.target_tps, 60);
    }
}
