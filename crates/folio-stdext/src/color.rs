//! Terminal coloring
//!
//! Terminal colors come from the [Colored crate](https://docs.rs/colored/latest/colored/),
//! enabled with the `color` Cargo feature.
//! Without the feature every method here returns its input unchanged,
//! so library crates can color their output without depending on a terminal.
//!
//! ```
//! use folio_stdext::color::Colorize;
//! println!["{}", "Overfull \\hbox".bold().bright_yellow()];
//! ```

#[cfg(feature = "color")]
pub type ColoredString = colored::ColoredString;

#[cfg(not(feature = "color"))]
pub type ColoredString = String;

macro_rules! colorize_impl {
    ( $( $method_name: ident, )+ ) => {
        /// Coloring methods on strings.
        ///
        /// See the module documentation.
        pub trait Colorize {
            $(
                fn $method_name(self) -> ColoredString;
            )+
        }
        #[cfg(feature="color")]
        impl Colorize for ColoredString {
            $(
                fn $method_name(self) -> ColoredString {
                    colored::Colorize::$method_name(self)
                }
            )+
        }
        #[cfg(feature="color")]
        impl Colorize for &str {
            $(
                fn $method_name(self) -> ColoredString {
                    colored::Colorize::$method_name(self)
                }
            )+
        }
        #[cfg(not(feature="color"))]
        impl Colorize for &str {
            $(
                fn $method_name(self) -> ColoredString {
                    self.to_string()
                }
            )+
        }
        #[cfg(not(feature="color"))]
        impl Colorize for String {
            $(
                fn $method_name(self) -> ColoredString {
                    self
                }
            )+
        }
    };
}

colorize_impl!(
    bold,
    bright_blue,
    bright_cyan,
    bright_red,
    bright_yellow,
    dimmed,
);
