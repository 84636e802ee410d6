// Wayland integration module
// Handles all Wayland-specific functionality using smithay-client-toolkit

use crate::image_loader::{ScaledImage, SourceImage};
use crate::overlay::{OverlayState, KEY_STEP, MIN_PERCENT, SCROLL_STEP};
use anyhow::{Context, Result};
use log::{debug, error, info};
use smithay_client_toolkit::{
    compositor::{CompositorHandler, CompositorState},
    delegate_compositor, delegate_keyboard, delegate_layer, delegate_output, delegate_pointer,
    delegate_registry, delegate_seat, delegate_shm,
    output::{OutputHandler, OutputState},
    registry::{ProvidesRegistryState, RegistryState},
    registry_handlers,
    seat::{
        keyboard::{KeyEvent, KeyboardHandler, Keysym, Modifiers},
        pointer::{PointerEvent, PointerEventKind, PointerHandler},
        Capability, SeatHandler, SeatState,
    },
    shell::{
        wlr_layer::{
            Anchor, KeyboardInteractivity, Layer, LayerShell, LayerShellHandler, LayerSurface,
            LayerSurfaceConfigure,
        },
        WaylandSurface,
    },
    shm::{
        slot::{Buffer, SlotPool},
        Shm, ShmHandler,
    },
};
use wayland_client::{
    globals::registry_queue_init,
    protocol::{wl_keyboard, wl_output, wl_pointer, wl_seat, wl_shm, wl_surface},
    Connection, QueueHandle,
};

/// Mouse button constant for the primary button
const BTN_LEFT: u32 = 272;

/// Maximum buffer size (64MB to avoid Wayland buffer issues)
const MAX_BUFFER_SIZE: usize = 64 * 1024 * 1024;

/// Main Wayland application state
struct CrosshairApp {
    // Registry state
    registry_state: RegistryState,
    // Seat state for input handling
    seat_state: SeatState,
    // Output state for display info
    output_state: OutputState,
    // Shared memory for buffer allocation
    shm: Shm,
    // Layer shell for overlay windows
    layer_shell: LayerShell,
    // Compositor state
    compositor_state: CompositorState,

    // Application-specific state
    image: SourceImage,
    scaled: ScaledImage,
    overlay: OverlayState,
    should_exit: bool,

    // Surface and buffer management
    layer_surface: Option<LayerSurface>,
    pool: Option<SlotPool>,
    buffer: Option<Buffer>,
    width: u32,
    height: u32,
    configured: bool,

    // Pointer state
    pointer_pos: (f64, f64),

    // Redraw flag
    needs_redraw: bool,
}

impl CrosshairApp {
    fn new(
        registry_state: RegistryState,
        seat_state: SeatState,
        output_state: OutputState,
        shm: Shm,
        layer_shell: LayerShell,
        compositor_state: CompositorState,
        image: SourceImage,
    ) -> Self {
        let overlay = OverlayState::new();
        let scaled = image.scale(overlay.size_percent());
        let (width, height) = (scaled.width, scaled.height);
        Self {
            registry_state,
            seat_state,
            output_state,
            shm,
            layer_shell,
            compositor_state,
            image,
            scaled,
            overlay,
            should_exit: false,
            layer_surface: None,
            pool: None,
            buffer: None,
            width,
            height,
            configured: false,
            pointer_pos: (0.0, 0.0),
            needs_redraw: false,
        }
    }

    /// Update window position using layer shell margins
    fn update_position(&mut self) {
        if let Some(ref layer_surface) = self.layer_surface {
            layer_surface.set_anchor(Anchor::TOP | Anchor::LEFT);
            layer_surface.set_margin(self.overlay.margin_top, 0, 0, self.overlay.margin_left);
            layer_surface.commit();
        }
    }

    /// Change the size percentage by `delta` and, if it changed, regenerate
    /// the scaled buffer and resize the window to match it exactly.
    fn adjust_size(&mut self, delta: i32, qh: &QueueHandle<Self>) {
        // The percentage itself has no ceiling, but a buffer the compositor
        // cannot allocate is useless; ignore steps past the buffer limit.
        let target = (self.overlay.size_percent() as i64 + delta as i64)
            .max(MIN_PERCENT as i64) as u32;
        if self.image.scaled_buffer_len(target) > MAX_BUFFER_SIZE {
            let (w, h) = self.image.scaled_size(target);
            info!("Ignoring resize to {}%: {}x{} exceeds the buffer limit", target, w, h);
            return;
        }

        if !self.overlay.adjust(delta) {
            return;
        }

        let percent = self.overlay.size_percent();
        self.scaled = self.image.scale(percent);
        self.width = self.scaled.width;
        self.height = self.scaled.height;
        info!("Size set to {}% ({}x{})", percent, self.width, self.height);

        if let Some(ref layer_surface) = self.layer_surface {
            layer_surface.set_size(self.width, self.height);
            layer_surface.commit();
        }
        // Reset pool to force buffer recreation at the new size
        self.pool = None;
        self.needs_redraw = true;
        self.draw(qh);
    }

    /// Draw the scaled crosshair into a shared memory buffer and commit it
    fn draw(&mut self, _qh: &QueueHandle<Self>) {
        if !self.configured || self.layer_surface.is_none() {
            return;
        }

        let width = self.width;
        let height = self.height;
        let stride = width as i32 * 4;
        let buffer_size = width as usize * height as usize * 4;

        // Initialize pool if needed
        if self.pool.is_none() {
            match SlotPool::new(buffer_size, &self.shm) {
                Ok(pool) => self.pool = Some(pool),
                Err(e) => {
                    error!("Failed to create slot pool ({} bytes): {}", buffer_size, e);
                    return;
                }
            }
        }

        let pool = match self.pool.as_mut() {
            Some(pool) => pool,
            None => return,
        };

        if pool.len() < buffer_size {
            if let Err(e) = pool.resize(buffer_size) {
                error!("Failed to resize pool to {} bytes: {}", buffer_size, e);
                self.pool = None;
                return;
            }
        }

        let (buffer, canvas) = match pool.create_buffer(
            width as i32,
            height as i32,
            stride,
            wl_shm::Format::Argb8888,
        ) {
            Ok(buf) => buf,
            Err(e) => {
                error!("Failed to create buffer {}x{}: {}", width, height, e);
                return;
            }
        };

        // The scaled buffer dimensions always equal the window dimensions
        canvas[..self.scaled.bgra.len()].copy_from_slice(&self.scaled.bgra);

        let layer_surface = match self.layer_surface.as_ref() {
            Some(ls) => ls,
            None => return,
        };
        let surface = layer_surface.wl_surface();
        if let Err(e) = buffer.attach_to(surface) {
            error!("Failed to attach buffer: {}", e);
            return;
        }
        surface.damage_buffer(0, 0, width as i32, height as i32);
        surface.commit();

        self.buffer = Some(buffer);
        self.needs_redraw = false;
    }
}

// Implement required traits for smithay-client-toolkit

impl CompositorHandler for CrosshairApp {
    fn scale_factor_changed(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _surface: &wl_surface::WlSurface,
        _new_factor: i32,
    ) {
        debug!("Scale factor changed");
    }

    fn transform_changed(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _surface: &wl_surface::WlSurface,
        _new_transform: wl_output::Transform,
    ) {
        debug!("Transform changed");
    }

    fn frame(
        &mut self,
        _conn: &Connection,
        qh: &QueueHandle<Self>,
        _surface: &wl_surface::WlSurface,
        _time: u32,
    ) {
        if self.needs_redraw {
            self.draw(qh);
        }
    }

    fn surface_enter(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _surface: &wl_surface::WlSurface,
        _output: &wl_output::WlOutput,
    ) {
    }

    fn surface_leave(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _surface: &wl_surface::WlSurface,
        _output: &wl_output::WlOutput,
    ) {
    }
}

impl OutputHandler for CrosshairApp {
    fn output_state(&mut self) -> &mut OutputState {
        &mut self.output_state
    }

    fn new_output(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _output: wl_output::WlOutput,
    ) {
        debug!("New output detected");
    }

    fn update_output(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _output: wl_output::WlOutput,
    ) {
        debug!("Output updated");
    }

    fn output_destroyed(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _output: wl_output::WlOutput,
    ) {
        debug!("Output destroyed");
    }
}

impl LayerShellHandler for CrosshairApp {
    fn closed(&mut self, _conn: &Connection, _qh: &QueueHandle<Self>, _layer: &LayerSurface) {
        info!("Layer surface closed");
        self.should_exit = true;
    }

    fn configure(
        &mut self,
        _conn: &Connection,
        qh: &QueueHandle<Self>,
        _layer: &LayerSurface,
        configure: LayerSurfaceConfigure,
        _serial: u32,
    ) {
        debug!("Layer surface configured: {:?}", configure);

        // The window size is always the scaled buffer size; re-assert it if
        // the compositor suggests something else.
        if configure.new_size != (self.width, self.height) {
            if let Some(ref layer_surface) = self.layer_surface {
                layer_surface.set_size(self.width, self.height);
                layer_surface.commit();
            }
        }

        self.configured = true;
        self.needs_redraw = true;
        self.draw(qh);
    }
}

impl SeatHandler for CrosshairApp {
    fn seat_state(&mut self) -> &mut SeatState {
        &mut self.seat_state
    }

    fn new_seat(&mut self, _conn: &Connection, _qh: &QueueHandle<Self>, _seat: wl_seat::WlSeat) {
        debug!("New seat");
    }

    fn new_capability(
        &mut self,
        _conn: &Connection,
        qh: &QueueHandle<Self>,
        seat: wl_seat::WlSeat,
        capability: Capability,
    ) {
        debug!("New capability: {:?}", capability);

        if capability == Capability::Keyboard {
            if let Err(e) = self.seat_state.get_keyboard(qh, &seat, None) {
                error!("Failed to get keyboard: {}", e);
            }
        }
        if capability == Capability::Pointer {
            if let Err(e) = self.seat_state.get_pointer(qh, &seat) {
                error!("Failed to get pointer: {}", e);
            }
        }
    }

    fn remove_capability(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _seat: wl_seat::WlSeat,
        _capability: Capability,
    ) {
        debug!("Capability removed");
    }

    fn remove_seat(&mut self, _conn: &Connection, _qh: &QueueHandle<Self>, _seat: wl_seat::WlSeat) {
        debug!("Seat removed");
    }
}

impl KeyboardHandler for CrosshairApp {
    fn enter(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _keyboard: &wl_keyboard::WlKeyboard,
        _surface: &wl_surface::WlSurface,
        _serial: u32,
        _raw: &[u32],
        _keysyms: &[Keysym],
    ) {
        debug!("Keyboard entered surface");
    }

    fn leave(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _keyboard: &wl_keyboard::WlKeyboard,
        _surface: &wl_surface::WlSurface,
        _serial: u32,
    ) {
        debug!("Keyboard left surface");
    }

    fn press_key(
        &mut self,
        _conn: &Connection,
        qh: &QueueHandle<Self>,
        _keyboard: &wl_keyboard::WlKeyboard,
        _serial: u32,
        event: KeyEvent,
    ) {
        debug!("Key pressed: {:?}", event.keysym);

        if event.keysym == Keysym::Escape {
            info!("Escape pressed, exiting");
            self.should_exit = true;
        } else if event.keysym == Keysym::plus || event.keysym == Keysym::equal {
            self.adjust_size(KEY_STEP, qh);
        } else if event.keysym == Keysym::minus {
            self.adjust_size(-KEY_STEP, qh);
        }
    }

    fn release_key(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _keyboard: &wl_keyboard::WlKeyboard,
        _serial: u32,
        _event: KeyEvent,
    ) {
    }

    fn update_modifiers(
        &mut self,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
        _keyboard: &wl_keyboard::WlKeyboard,
        _serial: u32,
        _modifiers: Modifiers,
        _layout: u32,
    ) {
    }
}

impl PointerHandler for CrosshairApp {
    fn pointer_frame(
        &mut self,
        _conn: &Connection,
        qh: &QueueHandle<Self>,
        _pointer: &wl_pointer::WlPointer,
        events: &[PointerEvent],
    ) {
        for event in events {
            match event.kind {
                PointerEventKind::Enter { .. } => {
                    debug!("Pointer entered");
                    self.pointer_pos = event.position;
                }
                PointerEventKind::Leave { .. } => {
                    debug!("Pointer left");
                    self.overlay.end_drag();
                }
                PointerEventKind::Motion { .. } => {
                    let (x, y) = event.position;
                    self.pointer_pos = (x, y);

                    if self.overlay.drag_motion(x, y).is_some() {
                        self.update_position();
                    }
                }
                PointerEventKind::Press { button, .. } => {
                    debug!("Pointer button pressed: {}", button);
                    if button == BTN_LEFT {
                        // Anchor at the press event's own position; the cached
                        // position is stale before any motion arrives
                        let (x, y) = event.position;
                        self.pointer_pos = (x, y);
                        self.overlay.begin_drag(x, y);
                    }
                }
                PointerEventKind::Release { button, .. } => {
                    if button == BTN_LEFT {
                        self.overlay.end_drag();
                    }
                }
                PointerEventKind::Axis { vertical, .. } => {
                    // Scroll up (negative axis value) grows the crosshair
                    if vertical.absolute != 0.0 {
                        let delta = if vertical.absolute < 0.0 {
                            SCROLL_STEP
                        } else {
                            -SCROLL_STEP
                        };
                        self.adjust_size(delta, qh);
                    }
                }
            }
        }
    }
}

impl ShmHandler for CrosshairApp {
    fn shm_state(&mut self) -> &mut Shm {
        &mut self.shm
    }
}

impl ProvidesRegistryState for CrosshairApp {
    fn registry(&mut self) -> &mut RegistryState {
        &mut self.registry_state
    }

    registry_handlers![OutputState, SeatState];
}

// Delegate macros
delegate_compositor!(CrosshairApp);
delegate_output!(CrosshairApp);
delegate_layer!(CrosshairApp);
delegate_seat!(CrosshairApp);
delegate_keyboard!(CrosshairApp);
delegate_pointer!(CrosshairApp);
delegate_shm!(CrosshairApp);
delegate_registry!(CrosshairApp);

/// Run the overlay window until Escape is pressed or the surface is closed
pub fn run(image: SourceImage) -> Result<()> {
    info!("Connecting to Wayland display");

    let conn = Connection::connect_to_env().context("Failed to connect to Wayland display")?;

    let (globals, mut event_queue) =
        registry_queue_init(&conn).context("Failed to initialize registry")?;
    let qh = event_queue.handle();

    let compositor_state =
        CompositorState::bind(&globals, &qh).context("Failed to bind compositor")?;
    let layer_shell = LayerShell::bind(&globals, &qh).context("Failed to bind layer shell")?;
    let shm = Shm::bind(&globals, &qh).context("Failed to bind shm")?;

    let mut app = CrosshairApp::new(
        RegistryState::new(&globals),
        SeatState::new(&globals, &qh),
        OutputState::new(&globals, &qh),
        shm,
        layer_shell,
        compositor_state,
        image,
    );

    // Dispatch once to get output info
    event_queue.roundtrip(&mut app)?;

    // Center the window on the display
    let (display_width, display_height) = get_display_dimensions(&app.output_state);
    info!("Display dimensions: {}x{}", display_width, display_height);
    app.overlay.margin_left = (display_width as i32 - app.width as i32) / 2;
    app.overlay.margin_top = (display_height as i32 - app.height as i32) / 2;

    // Create the layer surface
    let surface = app.compositor_state.create_surface(&qh);
    let layer_surface =
        app.layer_shell
            .create_layer_surface(&qh, surface, Layer::Overlay, Some("rcross"), None);

    layer_surface.set_anchor(Anchor::TOP | Anchor::LEFT);
    layer_surface.set_margin(app.overlay.margin_top, 0, 0, app.overlay.margin_left);
    layer_surface.set_size(app.width, app.height);
    layer_surface.set_keyboard_interactivity(KeyboardInteractivity::OnDemand);

    // Commit the surface to trigger configure
    layer_surface.commit();

    app.layer_surface = Some(layer_surface);

    info!("Starting event loop");
    info!("Controls: Drag to move, Scroll or +/- to resize, Escape to quit");

    loop {
        event_queue.blocking_dispatch(&mut app)?;

        if app.should_exit {
            info!("Exiting application");
            break;
        }
    }

    Ok(())
}

/// Get display dimensions from the output state
fn get_display_dimensions(output_state: &OutputState) -> (u32, u32) {
    for output in output_state.outputs() {
        if let Some(info) = output_state.info(&output) {
            if let Some(mode) = info.modes.iter().find(|m| m.current) {
                return (mode.dimensions.0 as u32, mode.dimensions.1 as u32);
            }
            if let Some(mode) = info.modes.first() {
                return (mode.dimensions.0 as u32, mode.dimensions.1 as u32);
            }
        }
    }
    (1920, 1080)
}
