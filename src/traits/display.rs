//! Display abstraction for the text-line screen.
//!
//! This module defines the [`TextDisplay`] trait: the entire rendering
//! contract between the core and a concrete back-end (OLED, TFT, or a
//! captured mock). The core produces text lines; drawing primitives,
//! fonts, and pixel layout stay on the other side of this trait.

/// Number of text lines the core renders per screen.
pub const DISPLAY_LINES: usize = 6;

/// Text-line display trait.
///
/// A back-end implementing this renders whatever lines the core hands it.
/// The optional flags cover the two special screens the reference
/// hardware has: password entry (mask all but the last character) and
/// list screens (separator rule under the heading).
///
/// # Example
///
/// ```ignore
/// use wit_throttle::traits::TextDisplay;
///
/// struct MyOled { /* ... */ }
///
/// impl TextDisplay for MyOled {
///     type Error = ();
///
///     fn render_lines(
///         &mut self,
///         lines: &[&str],
///         invert: &[bool],
///         password_mode: bool,
///         draw_separator: bool,
///     ) -> Result<(), ()> {
///         // Draw each line, inverting where flagged...
///         Ok(())
///     }
///
///     fn clear(&mut self) -> Result<(), ()> { Ok(()) }
///     fn power_save(&mut self, _on: bool) -> Result<(), ()> { Ok(()) }
/// }
/// ```
pub trait TextDisplay {
    /// Error type for display operations.
    type Error;

    /// Render up to [`DISPLAY_LINES`] text lines.
    ///
    /// `invert` parallels `lines`; a flagged line is drawn inverted
    /// (selection highlight). With `password_mode` set, the back-end
    /// masks all but the last character of the entry line. With
    /// `draw_separator`, a horizontal rule is drawn under the first line.
    fn render_lines(
        &mut self,
        lines: &[&str],
        invert: &[bool],
        password_mode: bool,
        draw_separator: bool,
    ) -> Result<(), Self::Error>;

    /// Clear the display.
    fn clear(&mut self) -> Result<(), Self::Error>;

    /// Enter or leave power-save mode (screen blanked, controller idle).
    fn power_save(&mut self, on: bool) -> Result<(), Self::Error>;
}
