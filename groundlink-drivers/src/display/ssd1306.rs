//! SSD1306 OLED Display Driver
//!
//! Driver for 128x64 SSD1306-based OLED displays via I2C. The frame buffer
//! is an `embedded-graphics` draw target; the status line is rendered with
//! the 6x10 monospace font on the bottom text row (21 characters).

use embedded_graphics::mono_font::ascii::FONT_6X10;
use embedded_graphics::mono_font::MonoTextStyle;
use embedded_graphics::pixelcolor::BinaryColor;
use embedded_graphics::prelude::*;
use embedded_graphics::text::{Baseline, Text};

use groundlink_core::traits::{DisplayError, StatusDisplay};
use groundlink_hal::I2cBus;

/// Default I2C address (0x3D with the address jumper closed)
pub const DEFAULT_ADDRESS: u8 = 0x3C;

/// Display dimensions
pub const WIDTH: usize = 128;
pub const HEIGHT: usize = 64;
const PAGES: usize = HEIGHT / 8;

/// Control byte before a command
const CONTROL_COMMAND: u8 = 0x00;
/// Control byte before display data
const CONTROL_DATA: u8 = 0x40;

/// SSD1306 commands
#[allow(dead_code)]
mod cmd {
    pub const DISPLAY_OFF: u8 = 0xAE;
    pub const DISPLAY_ON: u8 = 0xAF;
    pub const SET_CONTRAST: u8 = 0x81;
    pub const RESUME_RAM: u8 = 0xA4;
    pub const SET_NORMAL: u8 = 0xA6;
    pub const SET_INVERSE: u8 = 0xA7;
    pub const SET_MEMORY_MODE: u8 = 0x20;
    pub const SET_COLUMN_ADDR: u8 = 0x21;
    pub const SET_PAGE_ADDR: u8 = 0x22;
    pub const SET_DISPLAY_OFFSET: u8 = 0xD3;
    pub const SET_COM_PINS: u8 = 0xDA;
    pub const SET_VCOM_DETECT: u8 = 0xDB;
    pub const SET_CLOCK_DIV: u8 = 0xD5;
    pub const SET_PRECHARGE: u8 = 0xD9;
    pub const SET_MUX_RATIO: u8 = 0xA8;
    pub const SET_START_LINE: u8 = 0x40;
    pub const SET_SEG_REMAP: u8 = 0xA1;
    pub const SET_COM_SCAN_DEC: u8 = 0xC8;
    pub const SET_CHARGE_PUMP: u8 = 0x8D;
}

/// Power-on command sequence
const INIT_COMMANDS: &[u8] = &[
    cmd::DISPLAY_OFF,
    cmd::SET_CLOCK_DIV,
    0x80, // Default clock
    cmd::SET_MUX_RATIO,
    0x3F, // 64 lines
    cmd::SET_DISPLAY_OFFSET,
    0x00,
    cmd::SET_START_LINE,
    cmd::SET_CHARGE_PUMP,
    0x14, // Internal charge pump
    cmd::SET_MEMORY_MODE,
    0x00, // Horizontal addressing
    cmd::SET_SEG_REMAP,
    cmd::SET_COM_SCAN_DEC,
    cmd::SET_COM_PINS,
    0x12,
    cmd::SET_CONTRAST,
    0xCF,
    cmd::SET_PRECHARGE,
    0xF1,
    cmd::SET_VCOM_DETECT,
    0x40,
    cmd::RESUME_RAM,
    cmd::SET_NORMAL,
    cmd::DISPLAY_ON,
];

/// SSD1306 OLED driver
pub struct Ssd1306<I2C> {
    i2c: I2C,
    address: u8,
    /// Frame buffer (1 bit per pixel, organized as pages)
    buffer: [[u8; WIDTH]; PAGES],
}

impl<I2C: I2cBus> Ssd1306<I2C> {
    pub fn new(i2c: I2C, address: u8) -> Self {
        Self {
            i2c,
            address,
            buffer: [[0; WIDTH]; PAGES],
        }
    }

    /// Initialize the display and blank it
    pub fn init(&mut self) -> Result<(), I2C::Error> {
        for &c in INIT_COMMANDS {
            self.command(c)?;
        }
        self.clear_buffer();
        self.flush()
    }

    fn command(&mut self, cmd: u8) -> Result<(), I2C::Error> {
        self.i2c.write(self.address, &[CONTROL_COMMAND, cmd])
    }

    /// Clear the frame buffer
    pub fn clear_buffer(&mut self) {
        for page in self.buffer.iter_mut() {
            page.fill(0);
        }
    }

    /// Set one pixel; points outside the panel are ignored
    pub fn set_pixel(&mut self, point: Point, on: bool) {
        let (Ok(x), Ok(y)) = (usize::try_from(point.x), usize::try_from(point.y)) else {
            return;
        };
        if x >= WIDTH || y >= HEIGHT {
            return;
        }

        let bit = 1 << (y % 8);
        let byte = &mut self.buffer[y / 8][x];
        if on {
            *byte |= bit;
        } else {
            *byte &= !bit;
        }
    }

    pub fn pixel(&self, x: usize, y: usize) -> bool {
        x < WIDTH && y < HEIGHT && self.buffer[y / 8][x] & (1 << (y % 8)) != 0
    }

    /// Render `text` on the bottom text row
    pub fn draw_status(&mut self, text: &str) {
        let style = MonoTextStyle::new(&FONT_6X10, BinaryColor::On);
        let origin = Point::new(0, HEIGHT as i32 - 1);
        // Drawing into the frame buffer cannot fail
        Text::with_baseline(text, origin, style, Baseline::Bottom)
            .draw(self)
            .unwrap_or_else(|never| match never {});
    }

    /// Flush the frame buffer to the display
    pub fn flush(&mut self) -> Result<(), I2C::Error> {
        self.command(cmd::SET_COLUMN_ADDR)?;
        self.command(0)?;
        self.command((WIDTH - 1) as u8)?;
        self.command(cmd::SET_PAGE_ADDR)?;
        self.command(0)?;
        self.command((PAGES - 1) as u8)?;

        for page in 0..PAGES {
            let mut data = [0u8; WIDTH + 1];
            data[0] = CONTROL_DATA;
            data[1..].copy_from_slice(&self.buffer[page]);
            self.i2c.write(self.address, &data)?;
        }

        Ok(())
    }

    /// Turn display on/off
    pub fn set_display_on(&mut self, on: bool) -> Result<(), I2C::Error> {
        if on {
            self.command(cmd::DISPLAY_ON)
        } else {
            self.command(cmd::DISPLAY_OFF)
        }
    }

    pub fn release(self) -> I2C {
        self.i2c
    }
}

impl<I2C: I2cBus> OriginDimensions for Ssd1306<I2C> {
    fn size(&self) -> Size {
        Size::new(WIDTH as u32, HEIGHT as u32)
    }
}

impl<I2C: I2cBus> DrawTarget for Ssd1306<I2C> {
    type Color = BinaryColor;
    type Error = core::convert::Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            self.set_pixel(point, color.is_on());
        }
        Ok(())
    }
}

impl<I2C: I2cBus> StatusDisplay for Ssd1306<I2C> {
    fn show(&mut self, line: &str) -> Result<(), DisplayError> {
        self.clear_buffer();
        self.draw_status(line);
        self.flush().map_err(|_| DisplayError::Bus)
    }
}
