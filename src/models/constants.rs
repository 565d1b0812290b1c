// MIT License

/* Copyright (c) 2024 Based Labs

Permission is hereby granted, free of charge, to any person obtaining a copy of this software and associated documentation files (the "Software"), to deal in the Software without restriction, including without limitation the rights to use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of the Software, and to permit persons to whom the Software is furnished to do so, subject to the following conditions:

The above copyright notice and this permission notice shall be included in all copies or substantial portions of the Software.

THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE. */

// Popup geometry, in terminal cells
pub const POPUP_WIDTH: f64 = 46.0;
pub const POPUP_HEIGHT: f64 = 16.0;
pub const POPUP_MARGIN: f64 = 1.0;
pub const POPUP_FIT_BUFFER: f64 = 2.0;
pub const POPUP_STANDOFF: f64 = 2.0;

// Popup geometry for pixel viewports
pub const PIXEL_POPUP_WIDTH: f64 = 320.0;
pub const PIXEL_POPUP_HEIGHT: f64 = 300.0;
pub const PIXEL_MARGIN: f64 = 20.0;
pub const PIXEL_FIT_BUFFER: f64 = 50.0;
pub const PIXEL_STANDOFF: f64 = 40.0;

// Canvas layout
pub const LEVEL_SEPARATION: f64 = 30.0;
pub const ROW_SEPARATION: f64 = 4.0;
pub const MIN_ZOOM: f64 = 0.25;
pub const MAX_ZOOM: f64 = 4.0;
pub const ZOOM_STEP: f64 = 1.2;

// Timing constants
pub const REDRAW_TICK_MS: u64 = 100;
pub const INPUT_POLL_MS: u64 = 50;
pub const ENGINE_TIMEOUT_SECS: u64 = 30;

// Inference
pub const DEFAULT_SAMPLES: usize = 10_000;
pub const SAMPLING_SEED: u64 = 0x5eed_b10d;
pub const DEFAULT_ALERT_THRESHOLD: f64 = 0.6;

// Display
pub const ROOT_LABEL: &str = "Raíz";
pub const CONJUNCTION: &str = " ∧ ";
pub const SMALL_SCREEN_COLUMNS: u16 = 100;
pub const LOG_CAPACITY: usize = 200;
