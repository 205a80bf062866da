/// Terminal front end: keyboard navigation and ASCII rendering of the scene
use crossterm::{
    cursor,
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute, queue,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{self, ClearType},
};
use log::{debug, info};
use scanview_core::{FrameMonitor, NavKey, Projection, Scene, ViewerConfig};
use std::io::{self, stdout, Write};
use std::path::PathBuf;
use std::time::{Duration, Instant};

pub mod renderer;

pub use renderer::{AsciiRenderer, View};

const CONTROLS: &str =
    "Arrows=Orbit PgUp/PgDn=Roll +/-/W/S=Dolly A/D/Q/E=Pan Shift=Fast R=Reset T=Align O=Open Esc=Quit";

/// What a key press asks the application to do.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Navigate { key: NavKey, fast: bool },
    ResetView,
    Align,
    BeginOpen,
    Quit,
    Ignore,
}

/// Map a terminal key event outside of path entry.
pub fn map_key(event: &KeyEvent) -> Action {
    let fast = event.modifiers.contains(KeyModifiers::SHIFT);
    let navigate = |key| Action::Navigate { key, fast };
    match event.code {
        KeyCode::Esc => Action::Quit,
        KeyCode::Char('c') if event.modifiers.contains(KeyModifiers::CONTROL) => Action::Quit,
        KeyCode::Left => navigate(NavKey::Left),
        KeyCode::Right => navigate(NavKey::Right),
        KeyCode::Up => navigate(NavKey::Up),
        KeyCode::Down => navigate(NavKey::Down),
        KeyCode::PageUp => navigate(NavKey::PageUp),
        KeyCode::PageDown => navigate(NavKey::PageDown),
        KeyCode::Char('+') | KeyCode::Char('=') => navigate(NavKey::Plus),
        KeyCode::Char('-') | KeyCode::Char('_') => navigate(NavKey::Minus),
        KeyCode::Char(c) => match c.to_ascii_lowercase() {
            'r' => Action::ResetView,
            't' => Action::Align,
            'o' => Action::BeginOpen,
            // terminals report shifted letters as uppercase
            _ => Action::Navigate {
                key: NavKey::Char(c),
                fast: fast || c.is_ascii_uppercase(),
            },
        },
        _ => Action::Ignore,
    }
}

/// Main application struct for terminal 3D rendering
pub struct TerminalApp {
    scene: Scene,
    renderer: AsciiRenderer,
    projection: Projection,
    monitor: FrameMonitor,
    /// Path being typed after `O`; `None` outside of path entry.
    path_input: Option<String>,
    running: bool,
}

impl TerminalApp {
    pub fn new(config: &ViewerConfig) -> io::Result<Self> {
        let (width, height) = terminal::size()?;

        Ok(Self {
            scene: Scene::new(config),
            renderer: AsciiRenderer::new(width as usize, height as usize),
            projection: Projection::new(width as u32, height as u32 * 2)
                .with_mode(config.projection),
            monitor: FrameMonitor::new(Instant::now()),
            path_input: None,
            running: true,
        })
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn open(&mut self, path: impl Into<PathBuf>) {
        self.scene.request_load(path);
    }

    pub fn run(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(stdout(), terminal::EnterAlternateScreen, cursor::Hide)?;

        let result = self.main_loop();

        // Cleanup
        terminal::disable_raw_mode()?;
        execute!(stdout(), terminal::LeaveAlternateScreen, cursor::Show)?;

        result
    }

    fn main_loop(&mut self) -> io::Result<()> {
        let target_frame_time = Duration::from_millis(1000 / 30); // 30 FPS target

        while self.running {
            let frame_start = Instant::now();

            // Errors are already logged and shown in the status line
            let _ = self.scene.poll_pending_load();

            while event::poll(Duration::from_millis(0))? {
                match event::read()? {
                    Event::Key(key) if key.kind != KeyEventKind::Release => self.handle_key(&key),
                    Event::Resize(width, height) => self.resize(width, height),
                    _ => {}
                }
            }

            self.render()?;

            let report = self.monitor.tick(Instant::now(), self.scene.camera());
            self.scene.readouts_mut().record_frame(&report);

            let elapsed = frame_start.elapsed();
            if elapsed < target_frame_time {
                std::thread::sleep(target_frame_time - elapsed);
            }
        }

        info!("Terminal viewer closed");
        Ok(())
    }

    fn resize(&mut self, width: u16, height: u16) {
        debug!("Resize to {}x{}", width, height);
        self.renderer.resize(width as usize, height as usize);
        // terminal cells are roughly twice as tall as they are wide
        self.projection.resize(width as u32, height as u32 * 2);
    }

    pub fn handle_key(&mut self, key: &KeyEvent) {
        if let Some(input) = self.path_input.as_mut() {
            match key.code {
                KeyCode::Enter => {
                    let path = input.trim().to_string();
                    self.path_input = None;
                    if !path.is_empty() {
                        self.scene.request_load(path);
                    }
                }
                KeyCode::Esc => self.path_input = None,
                KeyCode::Backspace => {
                    input.pop();
                }
                KeyCode::Char(c) => input.push(c),
                _ => {}
            }
            return;
        }

        match map_key(key) {
            Action::Navigate { key, fast } => {
                self.scene.handle_key(key, fast);
            }
            Action::ResetView => self.scene.reset_view(),
            Action::Align => {
                // failures are logged and surfaced through the status readout
                let _ = self.scene.align_active_model();
            }
            Action::BeginOpen => self.path_input = Some(String::new()),
            Action::Quit => self.running = false,
            Action::Ignore => {}
        }
    }

    /// Overlay text, one entry per line.
    pub fn overlay_lines(&self) -> Vec<String> {
        let r = self.scene.readouts();
        let mut lines = vec![
            format!("ScanView | {} | FPS: {:.1}", r.status, r.fps),
            format!("Model: {}  Triangles: {}", r.active_model_name, r.triangle_count),
            format!("{}  {}  {}", r.bounding_box, r.load_duration, r.center_of_mass),
            format!("Position {}  Rotation {}", r.position, r.rotation),
            r.orientation.clone(),
            r.calibration.clone(),
        ];
        if !r.alignment.is_empty() {
            lines.push(r.alignment.clone());
        }
        match &self.path_input {
            Some(input) => lines.push(format!("Open model: {}_", input)),
            None => lines.push(CONTROLS.to_string()),
        }
        lines
    }

    fn render(&mut self) -> io::Result<()> {
        self.renderer.clear();

        if let Some(model) = self.scene.active() {
            let camera = self.scene.camera();
            let view = View {
                camera,
                projection: &self.projection,
                orbit_distance: (camera.position() - self.scene.controller().target().0).norm(),
            };
            self.renderer.render_model(model, &view);
        }

        let mut stdout = stdout();
        queue!(stdout, cursor::MoveTo(0, 0))?;
        self.renderer.draw(&mut stdout)?;

        // Draw UI overlay
        for (row, line) in self.overlay_lines().iter().enumerate() {
            let Ok(row) = u16::try_from(row) else { break };
            if row as usize >= self.renderer.height() {
                break;
            }
            let line: String = line.chars().take(self.renderer.width()).collect();
            queue!(
                stdout,
                cursor::MoveTo(0, row),
                terminal::Clear(ClearType::CurrentLine),
                SetForegroundColor(Color::Yellow),
                Print(line),
                ResetColor
            )?;
        }

        stdout.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn test_arrow_keys_navigate() {
        assert_eq!(
            map_key(&key(KeyCode::Left, KeyModifiers::NONE)),
            Action::Navigate { key: NavKey::Left, fast: false }
        );
        assert_eq!(
            map_key(&key(KeyCode::PageDown, KeyModifiers::SHIFT)),
            Action::Navigate { key: NavKey::PageDown, fast: true }
        );
    }

    #[test]
    fn test_uppercase_letter_is_fast() {
        assert_eq!(
            map_key(&key(KeyCode::Char('W'), KeyModifiers::SHIFT)),
            Action::Navigate { key: NavKey::Char('W'), fast: true }
        );
        assert_eq!(
            map_key(&key(KeyCode::Char('a'), KeyModifiers::NONE)),
            Action::Navigate { key: NavKey::Char('a'), fast: false }
        );
    }

    #[test]
    fn test_command_keys() {
        assert_eq!(map_key(&key(KeyCode::Char('r'), KeyModifiers::NONE)), Action::ResetView);
        assert_eq!(map_key(&key(KeyCode::Char('t'), KeyModifiers::NONE)), Action::Align);
        assert_eq!(map_key(&key(KeyCode::Char('o'), KeyModifiers::NONE)), Action::BeginOpen);
        assert_eq!(map_key(&key(KeyCode::Esc, KeyModifiers::NONE)), Action::Quit);
        assert_eq!(map_key(&key(KeyCode::Char('c'), KeyModifiers::CONTROL)), Action::Quit);
        // q pans down rather than quitting
        assert_eq!(
            map_key(&key(KeyCode::Char('q'), KeyModifiers::NONE)),
            Action::Navigate { key: NavKey::Char('q'), fast: false }
        );
    }

    #[test]
    fn test_plus_minus_dolly() {
        assert_eq!(
            map_key(&key(KeyCode::Char('+'), KeyModifiers::SHIFT)),
            Action::Navigate { key: NavKey::Plus, fast: true }
        );
        assert_eq!(
            map_key(&key(KeyCode::Char('-'), KeyModifiers::NONE)),
            Action::Navigate { key: NavKey::Minus, fast: false }
        );
        assert_eq!(map_key(&key(KeyCode::F(1), KeyModifiers::NONE)), Action::Ignore);
    }
}
