macro_rules! get_required_element {
    ($stream: expr, $expected: expr, $guidance: expr, $($pat:pat => $result:expr,)+) => {
        match ($stream).next()? {
            Some(token) => match token.value() {
                $(
                    $pat => Ok($result),
                )+
                _ => {
                    $stream.back(token);
                    Err(Box::<crate::error::Error>::from(
                        crate::parse::Error::new($expected, Some(token), $guidance),
                    ))
                }
            },
            None => Err(Box::<crate::error::Error>::from(
                crate::parse::Error::new($expected, None, $guidance),
            )),
        }
    };
}

macro_rules! get_optional_element {
    ($stream: expr, $($pat:pat => $result:expr,)+) => {
        match ($stream).next()? {
            None => None,
            Some(token) => match token.value() {
                $(
                    $pat => Some($result),
                )+
                _ => {
                    $stream.back(token);
                    None
                }
            }
        }
    };
}
