use super::dimen::parse_dimen_after_signs;
use super::keyword::parse_keyword;
use super::number;
use crate::command;
use crate::prelude as fl;
use crate::store::ValueType;
use crate::traits::*;
use crate::vm;
use folio_core::Glue;

impl<S: FolioState> Parsable<S> for Glue {
    fn parse_impl(input: &mut vm::ExpandedStream<S>) -> fl::Result<Self> {
        let negative = number::parse_optional_signs(input)?;
        if let Some(g) = parse_internal_glue(input)? {
            return Ok(if negative { negate(g) } else { g });
        }
        let (width, _) = parse_dimen_after_signs(input, negative, false)?;
        let mut g = Glue {
            width,
            ..Default::default()
        };
        if parse_keyword(input, "plus")? {
            let negative = number::parse_optional_signs(input)?;
            (g.stretch, g.stretch_order) = parse_dimen_after_signs(input, negative, true)?;
        }
        if parse_keyword(input, "minus")? {
            let negative = number::parse_optional_signs(input)?;
            (g.shrink, g.shrink_order) = parse_dimen_after_signs(input, negative, true)?;
        }
        Ok(g)
    }
}

/// Reads a glue variable, like `\skip 3` or `\baselineskip`, if one comes next.
fn parse_internal_glue<S: FolioState>(input: &mut vm::ExpandedStream<S>) -> fl::Result<Option<Glue>> {
    let Some(token) = input.next()? else {
        return Ok(None);
    };
    let variable = match token.command_ref() {
        None => None,
        Some(command_ref) => match input.commands_map().get_command(&command_ref) {
            Some(command::Command::Variable(variable))
                if variable.value_type() == ValueType::Glue =>
            {
                Some(*variable)
            }
            _ => None,
        },
    };
    let Some(variable) = variable else {
        input.back(token);
        return Ok(None);
    };
    Ok(Some(variable.value(token, input)?.as_glue()))
}

fn negate(g: Glue) -> Glue {
    Glue {
        width: -g.width,
        stretch: -g.stretch,
        shrink: -g.shrink,
        ..g
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::BuiltIn;
    use crate::parse::testing::*;
    use crate::store::{GlueParam, Location, StoreValue};
    use crate::variable::Variable;
    use folio_core::{GlueOrder, Scaled};
    use folio_stdext::collections::groupingmap::Scope;
    use std::collections::HashMap;

    fn glue(
        width: i32,
        stretch: i32,
        stretch_order: GlueOrder,
        shrink: i32,
        shrink_order: GlueOrder,
    ) -> Glue {
        Glue {
            width: Scaled::ONE * width,
            stretch: Scaled::ONE * stretch,
            stretch_order,
            shrink: Scaled::ONE * shrink,
            shrink_order,
        }
    }

    use GlueOrder::*;

    parse_success_tests![
        (width_only, "1pt", glue(1, 0, Normal, 0, Normal)),
        (negative_width, "-1pt", glue(-1, 0, Normal, 0, Normal)),
        (stretch, "1pt plus 2pt", glue(1, 2, Normal, 0, Normal)),
        (shrink, "1pt minus 3pt", glue(1, 0, Normal, 3, Normal)),
        (both, "1pt plus 2pt minus 3pt", glue(1, 2, Normal, 3, Normal)),
        (upper_case, "1pt PLUS 2pt MINUS 3pt", glue(1, 2, Normal, 3, Normal)),
        (stretch_fil, "0pt plus 1fil", glue(0, 1, Fil, 0, Normal)),
        (stretch_fill, "0pt plus 2fill", glue(0, 2, Fill, 0, Normal)),
        (stretch_filll, "0pt plus 3filll", glue(0, 3, Filll, 0, Normal)),
        (shrink_fil, "0pt minus 1fil", glue(0, 0, Normal, 1, Fil)),
        (negative_stretch, "0pt plus -1fil", glue(0, -1, Fil, 0, Normal)),
        (
            both_infinite,
            "1pt plus 1fill minus 2fil",
            glue(1, 1, Fill, 2, Fil)
        ),
    ];

    parse_failure_tests![
        Glue,
        (missing_width, "plus 1pt"),
        (missing_stretch_unit, "1pt plus 2"),
        (fil_width, "1fil"),
    ];

    parse_consumption_tests![
        Glue,
        (minus_without_dimension_is_not_consumed, "1pt minux", "minux "),
        (plus_consumed, "1pt plus 1pt x", "x "),
    ];

    #[test]
    fn internal_glue() {
        let mut vm = vm::VM::<()>::new(HashMap::from([(
            "parskip",
            BuiltIn::new_variable(Variable::Fixed(Location::GlueParam(GlueParam::ParSkip))),
        )]));
        vm.store.assign(
            Location::GlueParam(GlueParam::ParSkip),
            StoreValue::Glue(glue(1, 2, Fil, 3, Normal)),
            Scope::Global,
        );
        vm.push_source("", r"-\parskip");
        let input = vm::ExecutionInput::new(&mut vm);
        assert_eq!(Glue::parse(input).unwrap(), glue(-1, -2, Fil, -3, Normal));
    }
}
