//! Variables: commands that refer to a location in the store.
//!
//! A variable is either fixed, like `\tolerance`, which always refers to the same
//!     location, or indexed, like `\count`, which reads an index from the input
//!     to find its location.
//! Variables are read in numeric contexts (`\count 1` in `\ifnum\count 1>0`) and
//!     assigned when they appear in execution position (`\count 1=5`).

use crate::error;
use crate::parse::{OptionalEquals, Uint};
use crate::prelude as fl;
use crate::store::{Location, StoreValue, ValueType};
use crate::token;
use crate::traits::*;
use crate::vm;
use folio_core::{Glue, Scaled};
use folio_stdext::collections::groupingmap::Scope;

/// A variable command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variable {
    /// A variable that always refers to the same location.
    Fixed(Location),
    /// A variable whose location is chosen by an index read from the input.
    Indexed(Array),
}

/// An array of locations, addressed by an index read from the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Array {
    /// `\count n`, n in 0-255.
    Count,
    /// `\dimen n`, n in 0-255.
    Dimen,
    /// `\skip n`, n in 0-255.
    Skip,
    /// `\catcode n`, n a character code.
    CatCode,
}

impl Array {
    pub fn value_type(&self) -> ValueType {
        match self {
            Array::Count => ValueType::Int,
            Array::Dimen => ValueType::Dimen,
            Array::Skip => ValueType::Glue,
            Array::CatCode => ValueType::CatCode,
        }
    }
}

impl Variable {
    /// The kind of value the variable holds, known without reading any input.
    pub fn value_type(&self) -> ValueType {
        match self {
            Variable::Fixed(location) => location.value_type(),
            Variable::Indexed(array) => array.value_type(),
        }
    }

    /// Finds the location the variable refers to, reading an index if needed.
    pub fn resolve<S: FolioState>(
        &self,
        _token: token::Token,
        input: &mut vm::ExpandedStream<S>,
    ) -> fl::Result<Location> {
        Ok(match self {
            Variable::Fixed(location) => *location,
            Variable::Indexed(array) => match array {
                Array::Count => Location::Count(Uint::<256>::parse(input)?.0 as u8),
                Array::Dimen => Location::Dimen(Uint::<256>::parse(input)?.0 as u8),
                Array::Skip => Location::Skip(Uint::<256>::parse(input)?.0 as u8),
                Array::CatCode => Location::CatCode(char::parse(input)?),
            },
        })
    }

    /// Reads the current value of the variable.
    pub fn value<S: FolioState>(
        &self,
        token: token::Token,
        input: &mut vm::ExpandedStream<S>,
    ) -> fl::Result<StoreValue> {
        let location = self.resolve(token, input)?;
        Ok(input.vm().store.read(location))
    }

    /// Runs an assignment to the variable: `<variable><optional equals><value>`.
    pub fn assign<S: FolioState>(
        &self,
        token: token::Token,
        input: &mut vm::ExecutionInput<S>,
        scope: Scope,
    ) -> fl::Result<()> {
        let location = self.resolve(token, input.as_mut())?;
        OptionalEquals::parse(input)?;
        let value = parse_value(token, location, input)?;
        log::trace!(
            "assigning {value:?} to {location:?} ({scope:?})",
        );
        input.store_mut().assign(location, value, scope);
        Ok(())
    }
}

/// Parses a value of the type held at the location.
pub fn parse_value<S: FolioState>(
    token: token::Token,
    location: Location,
    input: &mut vm::ExecutionInput<S>,
) -> fl::Result<StoreValue> {
    Ok(match location.value_type() {
        ValueType::Int => StoreValue::Int(i32::parse(input)?),
        ValueType::Dimen => StoreValue::Dimen(Scaled::parse(input)?),
        ValueType::Glue => StoreValue::Glue(Glue::parse(input)?),
        ValueType::CatCode => StoreValue::CatCode(token::CatCode::parse(input)?),
        ValueType::Font => {
            return Err(error::SimpleTokenError::new(
                token,
                "the current font cannot be assigned directly",
            )
            .with_note(r"select a font by using a control sequence defined with \font")
            .into());
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::BuiltIn;
    use crate::store::IntParam;
    use std::collections::HashMap;

    fn setup(source: &str) -> vm::VM<()> {
        let mut vm = vm::VM::<()>::new(HashMap::from([
            ("count", BuiltIn::new_variable(Variable::Indexed(Array::Count))),
            ("dimen", BuiltIn::new_variable(Variable::Indexed(Array::Dimen))),
            ("skip", BuiltIn::new_variable(Variable::Indexed(Array::Skip))),
            ("catcode", BuiltIn::new_variable(Variable::Indexed(Array::CatCode))),
            (
                "tolerance",
                BuiltIn::new_variable(Variable::Fixed(Location::Int(IntParam::Tolerance))),
            ),
            (
                "font",
                BuiltIn::new_variable(Variable::Fixed(Location::CurrentFont)),
            ),
        ]));
        vm.push_source("", source);
        vm
    }

    fn assign(vm: &mut vm::VM<()>, scope: Scope) -> fl::Result<()> {
        let input = vm::ExecutionInput::new(vm);
        let token = input.next()?.unwrap();
        let command_ref = token.command_ref().unwrap();
        let variable = match input.commands_map().get_command(&command_ref) {
            Some(crate::command::Command::Variable(v)) => *v,
            _ => panic!("not a variable"),
        };
        variable.assign(token, input, scope)
    }

    #[test]
    fn assign_count() {
        let mut vm = setup(r"\count 5 = -12");
        assign(&mut vm, Scope::Local).unwrap();
        assert_eq!(vm.store.int(Location::Count(5)), -12);
    }

    #[test]
    fn assign_dimen() {
        let mut vm = setup(r"\dimen0 2pt");
        assign(&mut vm, Scope::Local).unwrap();
        assert_eq!(vm.store.dimen(Location::Dimen(0)), Scaled::TWO);
    }

    #[test]
    fn assign_skip() {
        let mut vm = setup(r"\skip200=1pt plus 1fil");
        assign(&mut vm, Scope::Local).unwrap();
        let g = vm.store.glue(Location::Skip(200));
        assert_eq!(g.width, Scaled::ONE);
        assert_eq!(g.stretch, Scaled::ONE);
        assert_eq!(g.stretch_order, folio_core::GlueOrder::Fil);
    }

    #[test]
    fn assign_catcode() {
        let mut vm = setup(r"\catcode`\@=11");
        assign(&mut vm, Scope::Local).unwrap();
        assert_eq!(vm.store.cat_code('@'), token::CatCode::Letter);
    }

    #[test]
    fn assign_parameter() {
        let mut vm = setup(r"\tolerance=\count1");
        vm.store
            .assign(Location::Count(1), StoreValue::Int(9999), Scope::Global);
        assign(&mut vm, Scope::Local).unwrap();
        assert_eq!(vm.store.int_param(IntParam::Tolerance), 9999);
    }

    #[test]
    fn assign_out_of_range() {
        let mut vm = setup(r"\count 256 = 1");
        assert!(assign(&mut vm, Scope::Local).is_err());
    }

    #[test]
    fn assign_invalid_catcode() {
        let mut vm = setup(r"\catcode`\@=16");
        assert!(assign(&mut vm, Scope::Local).is_err());
        assert_eq!(vm.store.cat_code('@'), token::CatCode::Other);
    }

    #[test]
    fn assign_current_font() {
        let mut vm = setup(r"\font=1");
        assert!(assign(&mut vm, Scope::Local).is_err());
    }

    #[test]
    fn value_types() {
        assert_eq!(Variable::Indexed(Array::Skip).value_type(), ValueType::Glue);
        assert_eq!(
            Variable::Fixed(Location::Int(IntParam::Tolerance)).value_type(),
            ValueType::Int
        );
    }
}
