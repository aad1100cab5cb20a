use anyhow::{Context, Result};
use clap::Parser;
use dotmatrix_core::gameboy::GameBoy;
use dotmatrix_core::input::Button;
use dotmatrix_core::ppu::{SCREEN_HEIGHT, SCREEN_WIDTH};
use pixels::{Pixels, SurfaceTexture};
use winit::{
    dpi::LogicalSize,
    event::{ElementState, Event, KeyboardInput, VirtualKeyCode, WindowEvent},
    event_loop::{ControlFlow, EventLoop},
    window::WindowBuilder,
};

#[derive(Parser, Debug)]
#[command(about = "Game Boy (DMG) emulator")]
struct Args {
    /// Path to a .gb ROM image
    rom: String,

    /// Integer scale factor for the 160x144 screen
    #[arg(long, default_value_t = 4)]
    scale: u32,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let rom = std::fs::read(&args.rom).with_context(|| format!("reading {}", args.rom))?;
    let mut gb = GameBoy::with_rom(rom).context("loading ROM")?;

    let width = SCREEN_WIDTH as u32;
    let height = SCREEN_HEIGHT as u32;

    let event_loop = EventLoop::new();
    let window = WindowBuilder::new()
        .with_title("dotmatrix")
        .with_inner_size(LogicalSize::new(
            (width * args.scale) as f64,
            (height * args.scale) as f64,
        ))
        .with_min_inner_size(LogicalSize::new(width as f64, height as f64))
        .build(&event_loop)?;

    let window_size = window.inner_size();
    let surface_texture = SurfaceTexture::new(window_size.width, window_size.height, &window);
    let mut pixels = Pixels::new(width, height, surface_texture)?;

    event_loop.run(move |event, _, control_flow| {
        *control_flow = ControlFlow::Poll;

        match event {
            Event::WindowEvent { event, .. } => match event {
                WindowEvent::CloseRequested => *control_flow = ControlFlow::Exit,
                WindowEvent::Resized(size) => {
                    pixels.resize_surface(size.width, size.height).ok();
                    window.request_redraw();
                }
                WindowEvent::KeyboardInput { input: key, .. } => {
                    handle_key(&mut gb, key);
                }
                _ => {}
            },
            Event::RedrawRequested(_) => {
                gb.run_until_frame();
                if gb.frame_ready() {
                    pixels.frame_mut().copy_from_slice(gb.frame());
                    gb.end_frame();
                }
                if pixels.render().is_err() {
                    *control_flow = ControlFlow::Exit;
                }
            }
            Event::MainEventsCleared => {
                window.request_redraw();
            }
            _ => {}
        }
    });
}

fn handle_key(gb: &mut GameBoy, key: KeyboardInput) {
    let pressed = key.state == ElementState::Pressed;

    let Some(keycode) = key.virtual_keycode else {
        return;
    };

    if keycode == VirtualKeyCode::P {
        if pressed {
            let pause = !gb.paused();
            gb.set_paused(pause);
            log::info!("{}", if pause { "pause requested" } else { "resumed" });
        }
        return;
    }
    if keycode == VirtualKeyCode::R {
        if pressed {
            gb.reset();
            log::info!("reset");
        }
        return;
    }

    let button = match keycode {
        VirtualKeyCode::Up => Button::Up,
        VirtualKeyCode::Down => Button::Down,
        VirtualKeyCode::Left => Button::Left,
        VirtualKeyCode::Right => Button::Right,
        VirtualKeyCode::Z => Button::A,
        VirtualKeyCode::X => Button::B,
        VirtualKeyCode::Return => Button::Start,
        VirtualKeyCode::RShift | VirtualKeyCode::LShift => Button::Select,
        _ => return,
    };

    if pressed {
        gb.press(button);
    } else {
        gb.release(button);
    }
}
