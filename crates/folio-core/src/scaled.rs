use std::fmt::Write;

/// Scaled numbers.
///
/// This is the fixed-width numeric type used for every distance in the engine.
/// The inner value is the number multiplied by 2^16, so there are 16 bits for the
/// fractional part.
/// Distances are limited to [Scaled::MAX_DIMEN] in absolute value, which is a little
/// under 2^14 points.
/// Keeping this limit is what makes the arithmetic below exact and portable.
#[derive(Default, PartialEq, Eq, Debug, Copy, Clone, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Scaled(pub i32);

/// Badness of an infinitely bad stretch or shrink.
pub const INF_BAD: i32 = 10000;

impl Scaled {
    pub const ZERO: Scaled = Scaled(0);

    pub const ONE: Scaled = Scaled(1 << 16);

    pub const TWO: Scaled = Scaled(1 << 17);

    /// Maximum possible dimension, which is (2^30-1)/2^16 points.
    ///
    /// This is _not_ the maximum of the underlying integer type.
    pub const MAX_DIMEN: Scaled = Scaled((1 << 30) - 1);

    /// Create a scaled number corresponding the provided integer.
    ///
    /// Scaled numbers are in the range `(-2^14, 2^14)`.
    /// If the integer is outside this range an overflow error is returned.
    pub fn from_integer(i: i32) -> Result<Scaled, OverflowError> {
        if i >= (1 << 14) || i <= -(1 << 14) {
            Err(OverflowError)
        } else {
            Ok(Scaled(Scaled::ONE.0 * i))
        }
    }

    /// Creates a scaled number from the digits of a decimal fraction.
    ///
    /// The digits `[2, 5]` give the scaled number closest to 0.25.
    /// At most 17 digits are significant.
    pub fn from_decimal_fraction(digits: &[u8]) -> Scaled {
        let mut a = 0;
        for d in digits.iter().take(17).rev() {
            a = (a + (*d as i32) * Scaled::TWO.0) / 10
        }
        Scaled((a + 1) / 2)
    }

    /// Builds a distance from an integer part and fractional part expressed in some unit.
    ///
    /// The conversion is exact in the same sense as TeX's: the integer part is converted
    /// with the unit's fraction and the remainder is carried into the fractional part.
    /// The result must be less than 2^14 points.
    pub fn from_parts(
        integer: i32,
        fraction: Scaled,
        unit: ScaledUnit,
    ) -> Result<Scaled, OverflowError> {
        if unit == ScaledUnit::ScaledPoint {
            return Ok(Scaled(integer));
        }
        let mut integer: i64 = integer.into();
        let mut fraction: i64 = fraction.0.into();
        let (n, d) = unit.conversion_fraction();
        if (n, d) != (1, 1) {
            let (n, d) = (n as i64, d as i64);
            let product = integer * n;
            let remainder = product % d;
            integer = product / d;
            fraction = (n * fraction + (1 << 16) * remainder) / d;
            integer += fraction / (1 << 16);
            fraction %= 1 << 16;
        }
        if integer >= (1 << 14) {
            return Err(OverflowError);
        }
        Ok(Scaled((integer * (1 << 16) + fraction) as i32))
    }

    /// Calculates `xn/d` and the remainder, where `x` is this number.
    ///
    /// The intermediate product is computed in 64 bits.
    /// An overflow error is returned if the result exceeds [Scaled::MAX_DIMEN].
    pub fn xn_over_d(&self, n: i32, d: i32) -> Result<(Scaled, Scaled), OverflowError> {
        let mut b: i64 = self.0.into();
        b *= n as i64;
        let remainder = (b % (d as i64)) as i32;
        b /= d as i64;
        if b.abs() > Scaled::MAX_DIMEN.0 as i64 {
            return Err(OverflowError);
        }
        Ok((Scaled(b as i32), Scaled(remainder)))
    }

    /// Calculates `nx+y`, where `x` is this number, returning an error on overflow.
    pub fn nx_plus_y(self, mut n: i32, y: Scaled) -> Result<Scaled, OverflowError> {
        let max_answer = Scaled::MAX_DIMEN;
        if n == 0 {
            return Ok(y);
        }
        let mut x = self;
        if n < 0 {
            n = -n;
            x = -x;
        }
        if x <= (max_answer - y) / n && -x <= (max_answer + y) / n {
            Ok(x * n + y)
        } else {
            Err(OverflowError)
        }
    }

    /// Multiplies by a floating point ratio, as when setting glue.
    ///
    /// The result is rounded to the nearest scaled point and clamped to the valid range.
    pub fn mul_ratio(self, ratio: f64) -> Scaled {
        let v = (self.0 as f64 * ratio).round();
        let max = Scaled::MAX_DIMEN.0 as f64;
        Scaled(v.clamp(-max, max) as i32)
    }

    pub fn integer_part(self) -> i32 {
        self.0 / Scaled::ONE.0
    }

    pub fn fractional_part(self) -> Scaled {
        self % Scaled::ONE.0
    }

    pub fn abs(self) -> Scaled {
        Scaled(self.0.abs())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverflowError;

impl std::fmt::Display for OverflowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "dimension too large")
    }
}

impl std::error::Error for OverflowError {}

impl std::fmt::Display for Scaled {
    /// Prints the shortest decimal that reads back as the same scaled number, in points.
    fn fmt(&self, fm: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0 < 0 {
            fm.write_char('-')?;
        }
        let s = self.abs();
        write!(fm, "{}.", s.integer_part())?;
        let mut f = s.fractional_part().0 * 10 + 5;
        let mut delta = 10;
        loop {
            if delta > Scaled::ONE.0 {
                // round the last digit
                f += 0o100000 - 50000;
            }
            let digit = (f / Scaled::ONE.0) as u32;
            fm.write_char(char::from_digit(digit, 10).unwrap_or('0'))?;
            f = 10 * (f % Scaled::ONE.0);
            delta *= 10;
            if f <= delta {
                break;
            }
        }
        write!(fm, "pt")
    }
}

impl std::str::FromStr for Scaled {
    type Err = String;

    /// Parses distances like `12pt`, `-1.5in` or `0.25cm`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.len() < 2 || !s.is_char_boundary(s.len() - 2) {
            return Err(format!("`{s}` is not a distance"));
        }
        let (number, unit) = s.split_at(s.len() - 2);
        let unit = ScaledUnit::parse(unit).ok_or_else(|| format!("unknown unit in `{s}`"))?;
        let (negative, number) = match number.strip_prefix('-') {
            None => (false, number),
            Some(rest) => (true, rest),
        };
        let (integer, fraction) = number.split_once('.').unwrap_or((number, ""));
        let integer: i32 = if integer.is_empty() {
            0
        } else {
            integer
                .parse()
                .map_err(|_| format!("invalid number in `{s}`"))?
        };
        let digits: Vec<u8> = fraction
            .chars()
            .map(|c| c.to_digit(10).map(|d| d as u8))
            .collect::<Option<_>>()
            .ok_or_else(|| format!("invalid number in `{s}`"))?;
        let value = Scaled::from_parts(integer, Scaled::from_decimal_fraction(&digits), unit)
            .map_err(|err| err.to_string())?;
        Ok(if negative { -value } else { value })
    }
}

impl std::ops::Add<Scaled> for Scaled {
    type Output = Scaled;
    fn add(self, rhs: Scaled) -> Self::Output {
        Scaled(self.0.wrapping_add(rhs.0))
    }
}

impl std::ops::AddAssign<Scaled> for Scaled {
    fn add_assign(&mut self, rhs: Scaled) {
        *self = *self + rhs;
    }
}

impl std::ops::Sub<Scaled> for Scaled {
    type Output = Scaled;
    fn sub(self, rhs: Scaled) -> Self::Output {
        Scaled(self.0.wrapping_sub(rhs.0))
    }
}

impl std::ops::SubAssign<Scaled> for Scaled {
    fn sub_assign(&mut self, rhs: Scaled) {
        *self = *self - rhs;
    }
}

impl std::ops::Mul<i32> for Scaled {
    type Output = Scaled;
    fn mul(self, rhs: i32) -> Self::Output {
        Scaled(self.0.wrapping_mul(rhs))
    }
}

impl std::ops::Div<i32> for Scaled {
    type Output = Scaled;
    fn div(self, rhs: i32) -> Self::Output {
        Scaled(self.0 / rhs)
    }
}

impl std::ops::Rem<i32> for Scaled {
    type Output = Scaled;
    fn rem(self, rhs: i32) -> Self::Output {
        Scaled(self.0 % rhs)
    }
}

impl std::ops::Neg for Scaled {
    type Output = Scaled;
    fn neg(self) -> Self::Output {
        Scaled(-self.0)
    }
}

impl std::iter::Sum for Scaled {
    fn sum<I: Iterator<Item = Scaled>>(iter: I) -> Self {
        iter.fold(Scaled::ZERO, |a, b| a + b)
    }
}

/// Unit of a distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaledUnit {
    Point,
    Pica,
    Inch,
    BigPoint,
    Centimeter,
    Millimeter,
    DidotPoint,
    Cicero,
    ScaledPoint,
}

impl ScaledUnit {
    /// Parses a unit from its two character abbreviation, like `pc`.
    pub fn parse(s: &str) -> Option<Self> {
        use ScaledUnit::*;
        Some(match s {
            "pt" => Point,
            "pc" => Pica,
            "in" => Inch,
            "bp" => BigPoint,
            "cm" => Centimeter,
            "mm" => Millimeter,
            "dd" => DidotPoint,
            "cc" => Cicero,
            "sp" => ScaledPoint,
            _ => return None,
        })
    }

    /// All units, in the order keywords are tried by the dimension parser.
    pub const ALL: [ScaledUnit; 9] = [
        ScaledUnit::Point,
        ScaledUnit::Pica,
        ScaledUnit::Inch,
        ScaledUnit::BigPoint,
        ScaledUnit::Centimeter,
        ScaledUnit::Millimeter,
        ScaledUnit::DidotPoint,
        ScaledUnit::Cicero,
        ScaledUnit::ScaledPoint,
    ];

    pub fn abbreviation(&self) -> &'static str {
        use ScaledUnit::*;
        match self {
            Point => "pt",
            Pica => "pc",
            Inch => "in",
            BigPoint => "bp",
            Centimeter => "cm",
            Millimeter => "mm",
            DidotPoint => "dd",
            Cicero => "cc",
            ScaledPoint => "sp",
        }
    }

    /// Returns the fraction (_n_, _d_) converting this unit to points:
    /// _x_ in this unit is _nx_/_d_ points.
    pub fn conversion_fraction(&self) -> (i32, i32) {
        use ScaledUnit::*;
        match self {
            Point => (1, 1),
            Pica => (12, 1),
            Inch => (7227, 100),
            BigPoint => (7227, 7200),
            Centimeter => (7227, 254),
            Millimeter => (7227, 2540),
            DidotPoint => (1238, 1157),
            Cicero => (14856, 1157),
            ScaledPoint => (1, 1 << 16),
        }
    }
}

/// Badness of stretching or shrinking material by `t` when `s` is available.
///
/// The result is approximately `100(t/s)^3`, capped at [INF_BAD].
/// It is 0 if nothing needs to change and [INF_BAD] if `s` is not positive.
/// The computation is integer-only so breaking decisions are reproducible.
pub fn badness(t: Scaled, s: Scaled) -> i32 {
    let (t, s) = (t.0, s.0);
    if t == 0 {
        return 0;
    }
    if s <= 0 {
        return INF_BAD;
    }
    // r is about 297*t/s; 297^3 is about 100*2^18.
    let r = if t <= 7_230_584 {
        (t * 297) / s
    } else if s >= 1_663_497 {
        t / (s / 297)
    } else {
        t
    };
    if r > 1290 {
        INF_BAD
    } else {
        (r * r * r + 0o400000) / 0o1000000
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    macro_rules! display_tests {
        ( $( ($name: ident, $value: expr, $want: expr), )+ ) => {
            $(
            #[test]
            fn $name() {
                assert_eq!(format!("{}", $value), $want);
            }
            )+
        };
    }

    display_tests!(
        (display_zero, Scaled::ZERO, "0.0pt"),
        (display_one, Scaled::ONE, "1.0pt"),
        (display_half, Scaled::ONE / 2, "0.5pt"),
        (display_negative, -Scaled::ONE * 3 / 2, "-1.5pt"),
        (display_one_sp, Scaled(1), "0.00002pt"),
    );

    #[test]
    fn from_str_points() {
        assert_eq!("12pt".parse::<Scaled>(), Ok(Scaled::ONE * 12));
        assert_eq!("-0.5pt".parse::<Scaled>(), Ok(-Scaled::ONE / 2));
    }

    #[test]
    fn from_str_inches() {
        let inch: Scaled = "1in".parse().unwrap();
        assert_eq!(inch, Scaled(4736286));
    }

    #[test]
    fn from_str_invalid() {
        assert!("12".parse::<Scaled>().is_err());
        assert!("12xx".parse::<Scaled>().is_err());
        assert!("20000pt".parse::<Scaled>().is_err());
    }

    #[test]
    fn xn_over_d() {
        let (q, r) = Scaled(10).xn_over_d(3, 4).unwrap();
        assert_eq!(q, Scaled(7));
        assert_eq!(r, Scaled(2));
        assert!(Scaled::MAX_DIMEN.xn_over_d(2, 1).is_err());
    }

    #[test]
    fn nx_plus_y() {
        assert_eq!(Scaled(3).nx_plus_y(4, Scaled(5)), Ok(Scaled(17)));
        assert!(Scaled::MAX_DIMEN.nx_plus_y(2, Scaled::ZERO).is_err());
    }

    macro_rules! badness_tests {
        ( $( ($name: ident, $t: expr, $s: expr, $want: expr), )+ ) => {
            $(
            #[test]
            fn $name() {
                assert_eq!(badness($t, $s), $want);
            }
            )+
        };
    }

    badness_tests!(
        (badness_no_change, Scaled::ZERO, Scaled::ONE, 0),
        (badness_no_stretch, Scaled::ONE, Scaled::ZERO, INF_BAD),
        (badness_full_stretch, Scaled::ONE, Scaled::ONE, 100),
        (badness_half_stretch, Scaled::ONE, Scaled::ONE * 2, 12),
        (badness_double_stretch, Scaled::ONE * 2, Scaled::ONE, 800),
        (badness_too_much, Scaled::ONE * 10, Scaled::ONE, INF_BAD),
    );
}
