//! End-to-end scenarios over scripted backends: frame loop, input
//! derivation, canvas compositing, audio control.

use std::sync::Arc;

use lienzo::{
    Color, Context, Event, HeadlessDriver, Key, KeyState, MouseButton, Params, PlatformDriver,
    VoiceId, VoiceState, VoiceType,
};
use lienzo_audio::MockBackend;
use lienzo_render::SoftBackend;
use parking_lot::Mutex;

/// A window driver steered by the test through shared state.
#[derive(Clone, Default)]
struct ScriptedDriver {
    state: Arc<Mutex<ScriptedState>>,
}

#[derive(Default)]
struct ScriptedState {
    title: String,
    size: (i32, i32),
    close_requested: bool,
    swaps: u64,
}

impl ScriptedDriver {
    fn request_close(&self) {
        self.state.lock().close_requested = true;
    }

    fn swaps(&self) -> u64 {
        self.state.lock().swaps
    }
}

impl PlatformDriver for ScriptedDriver {
    fn name(&self) -> &str {
        "scripted"
    }

    fn pump_events(&mut self, _queue: &mut lienzo_platform::EventQueue) -> bool {
        !self.state.lock().close_requested
    }

    fn swap_buffers(&mut self) {
        self.state.lock().swaps += 1;
    }

    fn window_title(&self) -> &str {
        // Lock guards can't escape; tests read the title via the state.
        ""
    }

    fn set_window_title(&mut self, title: &str) {
        self.state.lock().title = title.to_string();
    }

    fn window_size(&self) -> (i32, i32) {
        self.state.lock().size
    }

    fn set_window_size(&mut self, width: i32, height: i32) {
        self.state.lock().size = (width, height);
    }

    fn graphics_context_name(&self) -> &str {
        "none"
    }
}

fn headless_context(window: (i32, i32), canvas: Option<(u32, u32)>) -> (Context, SoftBackend, MockBackend) {
    let soft = SoftBackend::new(window.0.max(1) as u32, window.1.max(1) as u32);
    let mock = MockBackend::new();

    let ctx = Context::with_backends(
        Box::new(HeadlessDriver::new(window.0, window.1)),
        Box::new(soft.clone()),
        Arc::new(mock.clone()),
        Params {
            window_size: window,
            canvas_size: canvas,
            ..Params::default()
        },
    );

    (ctx, soft, mock)
}

fn silence_wav(samples: usize) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 44_100,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for _ in 0..samples {
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();
    }

    cursor.into_inner()
}

#[test]
fn test_rotated_rectangle_on_canvas() {
    let (mut ctx, soft, _) = headless_context((512, 512), Some((512, 512)));

    ctx.clear(Color::rgb(0x18, 0x18, 0x18));

    ctx.push_matrix();
    ctx.translate(256.0, 256.0);
    ctx.rotate(45.0);
    ctx.draw_rectangle(
        -64.0,
        -64.0,
        128.0,
        128.0,
        Color::rgb(0xE0, 0xE0, 0xE0),
        Color::rgb(0x20, 0x20, 0x20),
    );
    ctx.pop_matrix();

    ctx.present();

    // The canvas was composited to the window; its center shows the fill.
    assert_eq!(
        soft.read_pixel(0, 256, 256),
        Some(Color::rgba(0x20, 0x20, 0x20, 255))
    );
}

#[test]
fn test_key_events_flow_through_process() {
    let (mut ctx, _, _) = headless_context((256, 256), None);

    ctx.enqueue_event(Event::KeyPressed { key: Key::Space });
    assert!(ctx.process());
    assert!(ctx.is_key_pressed(Key::Space));

    ctx.enqueue_event(Event::KeyReleased { key: Key::Space });
    assert!(ctx.process());
    assert_eq!(ctx.key_state(Key::Space), KeyState::Released);

    // The one-frame Released state decays on the next frame.
    assert!(ctx.process());
    assert_eq!(ctx.key_state(Key::Space), KeyState::Idle);
}

#[test]
fn test_focus_loss_purges_held_input() {
    let (mut ctx, _, _) = headless_context((256, 256), None);

    let released = Arc::new(Mutex::new(Vec::new()));
    let log = released.clone();
    ctx.on_key_released(Box::new(move |key| log.lock().push(key)));

    for key in [Key::A, Key::W, Key::S] {
        ctx.enqueue_event(Event::KeyPressed { key });
    }
    ctx.enqueue_event(Event::MouseButtonPressed { button: MouseButton::Left });
    assert!(ctx.process());
    assert_eq!(ctx.mouse_button_state(), 1);

    ctx.enqueue_event(Event::Deactivated);
    assert!(ctx.process());

    // Purged in key-table order, all state cleared.
    assert_eq!(*released.lock(), vec![Key::A, Key::S, Key::W]);
    assert!(!ctx.is_window_active());
    assert_eq!(ctx.mouse_button_state(), 0);

    assert!(ctx.process());
    for state in ctx.keyboard_state() {
        assert_eq!(*state, KeyState::Idle);
    }
}

#[test]
fn test_cursor_position_converts_to_canvas() {
    // 256-unit canvas in a 512-pixel window: everything halves.
    let (mut ctx, _, _) = headless_context((512, 512), Some((256, 256)));

    ctx.enqueue_event(Event::MouseCursorMoved { x: 100, y: 300 });
    assert!(ctx.process());

    assert_eq!(ctx.mouse_cursor_position(), (50, 150));
    assert_eq!(ctx.mouse_cursor_delta(), (50, 150));
}

#[test]
fn test_wheel_and_touch_snapshot() {
    let (mut ctx, _, _) = headless_context((256, 256), None);

    ctx.enqueue_event(Event::MouseWheelScrolled { dx: 0, dy: 2 });
    ctx.enqueue_event(Event::MouseWheelScrolled { dx: 1, dy: 0 });
    ctx.enqueue_event(Event::TouchStarted { index: 0, x: 30, y: 40 });
    assert!(ctx.process());

    assert_eq!(ctx.mouse_wheel_delta(), (1, 2));
    assert!(ctx.is_touch_pressed(0));
    assert_eq!(ctx.touch_position(0), Some((30, 40)));
    assert!(!ctx.is_touch_pressed(5));
}

#[test]
fn test_close_request_stops_the_loop() {
    let driver = ScriptedDriver::default();
    let probe = driver.clone();

    let ctx = Context::with_backends(
        Box::new(driver),
        Box::new(SoftBackend::new(64, 64)),
        Arc::new(MockBackend::new()),
        Params {
            window_size: (64, 64),
            ..Params::default()
        },
    );

    let mut frames = 0;
    ctx.execute(move |ctx| {
        frames += 1;
        ctx.present();

        if frames == 3 {
            probe.request_close();
        }

        true
    });
}

#[test]
fn test_present_swaps_buffers() {
    let driver = ScriptedDriver::default();
    let probe = driver.clone();

    let mut ctx = Context::with_backends(
        Box::new(driver),
        Box::new(SoftBackend::new(64, 64)),
        Arc::new(MockBackend::new()),
        Params {
            window_size: (64, 64),
            ..Params::default()
        },
    );

    ctx.present();
    ctx.present();
    assert_eq!(probe.swaps(), 2);
}

#[test]
fn test_sound_playback_through_context() {
    let (mut ctx, _, mock) = headless_context((256, 256), None);

    let sound = ctx
        .load_sound_from_bytes("fanfare.wav", silence_wav(4096))
        .unwrap();

    let voices: Vec<VoiceId> = (0..3).map(|_| ctx.play_sound(sound)).collect();

    for voice in &voices {
        assert!(voice.is_valid());
        assert_eq!(
            ctx.audio().voice_state(*voice),
            Some((VoiceType::Sound, VoiceState::Playing))
        );
    }

    assert_eq!(mock.live_sources(), 3);

    // Invalid voices are inert through the public API.
    ctx.pause_voice(VoiceId::INVALID);
    ctx.stop_voice(VoiceId::INVALID);
}

#[test]
fn test_music_control_through_context() {
    let (mut ctx, _, _) = headless_context((256, 256), None);

    let music = ctx
        .open_music_from_bytes("dungeon.wav", silence_wav(4096 * 32))
        .unwrap();

    let voice = ctx.loop_music(music);
    assert!(voice.is_valid());

    // Idempotent while playing.
    assert_eq!(ctx.play_music(music), voice);

    ctx.pause_voice(voice);
    assert_eq!(
        ctx.audio().voice_state(voice),
        Some((VoiceType::Music, VoiceState::Paused))
    );

    ctx.unpause_voice(voice);
    ctx.stop_voice(voice);
    ctx.close_music(music);

    // Closed handle is stale and inert.
    assert_eq!(ctx.play_music(music), VoiceId::INVALID);
}

#[test]
fn test_stale_resource_handles_are_inert() {
    let (mut ctx, _, _) = headless_context((128, 128), None);

    let texture = ctx.create_texture(16, 16, 4).unwrap();
    ctx.destroy_texture(texture);

    // None of these may panic or draw.
    ctx.draw_texture(texture, 0.0, 0.0, 16.0, 16.0);
    ctx.set_texture_smooth(texture, true);
    ctx.destroy_texture(texture);

    let surface = ctx.create_surface(32, 32).unwrap();
    ctx.destroy_surface(surface);
    ctx.set_surface(surface);
    ctx.draw_surface(surface, 0.0, 0.0, 32.0, 32.0);
    ctx.destroy_surface(surface);
}

#[test]
fn test_texture_slots_are_reused_not_leaked() {
    let (mut ctx, _, _) = headless_context((64, 64), None);

    for _ in 0..2 {
        let handles: Vec<_> = (0..1000)
            .map(|_| ctx.create_texture(1, 1, 4).unwrap())
            .collect();

        for handle in handles {
            ctx.destroy_texture(handle);
        }
    }

    // A fresh allocation still lands in the recycled range: raw ids encode
    // slot indices below 1024.
    let handle = ctx.create_texture(1, 1, 4).unwrap();
    assert!((handle.raw() & 0x3FFFF) < 1024);
}

#[test]
fn test_surface_rendering_through_context() {
    let (mut ctx, soft, _) = headless_context((64, 64), None);

    let surface = ctx.create_surface(16, 16).unwrap();

    ctx.set_surface(surface);
    ctx.clear(Color::rgb(255, 128, 0));
    ctx.reset_surface();

    ctx.clear(Color::BLACK);
    ctx.draw_surface(surface, 0.0, 0.0, 64.0, 64.0);

    assert_eq!(
        soft.read_pixel(0, 32, 32),
        Some(Color::rgba(255, 128, 0, 255))
    );
}

#[test]
fn test_clock_and_date() {
    let (ctx, _, _) = headless_context((64, 64), None);

    assert!(ctx.time_highp() >= 0.0);
    assert!(ctx.time_mediump() >= 0.0);

    let now = ctx.date_time();
    assert!(now.year >= 2024);
    assert!((1..=12).contains(&now.month));
    assert!((1..=31).contains(&now.day));
}

#[test]
fn test_window_properties() {
    let (mut ctx, _, _) = headless_context((320, 200), None);

    assert_eq!(ctx.window_size(), (320, 200));

    ctx.set_window_title("retitled");
    assert_eq!(ctx.window_title(), "retitled");

    ctx.set_window_size(640, 400);
    assert_eq!(ctx.window_size(), (640, 400));
}

#[test]
fn test_window_resize_event_reaches_renderer() {
    let (mut ctx, _, _) = headless_context((512, 512), Some((256, 256)));

    // Resize the window: the letterbox math follows.
    ctx.enqueue_event(Event::WindowResized { width: 1024, height: 512 });
    assert!(ctx.process());

    // 256-unit canvas in 1024x512: scale 2, x offset 256.
    ctx.enqueue_event(Event::MouseCursorMoved { x: 256, y: 0 });
    assert!(ctx.process());
    assert_eq!(ctx.mouse_cursor_position(), (0, 0));

    ctx.enqueue_event(Event::MouseCursorMoved { x: 768, y: 512 });
    assert!(ctx.process());
    assert_eq!(ctx.mouse_cursor_position(), (255, 255));
}

#[test]
fn test_joystick_queries_answer_via_null_driver() {
    let (ctx, _, _) = headless_context((64, 64), None);

    assert!(!ctx.is_joystick_connected(0));
    assert_eq!(ctx.joystick_name(0), None);
    assert_eq!(ctx.joystick_button_count(0), 0);
    assert_eq!(ctx.joystick_axis_value(0, 0), 0.0);
}
