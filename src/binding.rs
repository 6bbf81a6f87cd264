//! Binding a call's arguments to a declared parameter list.
//!
//! A [`Signature`] lists a function's parameters in declaration order. Binding
//! an [`Arguments`] value against it fills positional values first, then
//! keywords by name, then declared defaults, and yields a mutable
//! [`BoundArguments`] mapping from parameter name to value.
//!
//! Values are type-erased; bodies read them back with [`BoundArguments::take`]
//! or [`BoundArguments::get`].
//!
//! # Examples
//!
//! ```
//! use callback_guard::{Arguments, Signature};
//!
//! let signature = Signature::new("greet").param("name").param_or("punct", '!');
//! let mut bound = signature
//!     .bind(Arguments::new().arg("world".to_string()))
//!     .unwrap();
//!
//! let name: String = bound.take("name").unwrap();
//! let punct: char = bound.take("punct").unwrap();
//! assert_eq!(format!("hello {name}{punct}"), "hello world!");
//! ```

use std::any::{type_name, Any};
use std::fmt;
use std::sync::Arc;

use crate::CallbackError;

/// A type-erased argument value.
pub type Value = Box<dyn Any + Send>;

type DefaultFn = Arc<dyn Fn() -> Value + Send + Sync>;

/// How a parameter accepts its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// Filled by position or by name.
    PositionalOrKeyword,
    /// Filled by name only.
    KeywordOnly,
    /// Collects surplus positional values as a `Vec<Value>`.
    VarPositional,
    /// Collects unknown keyword values as a `Vec<(String, Value)>`.
    VarKeyword,
}

/// One declared parameter.
#[derive(Clone)]
pub struct Parameter {
    name: &'static str,
    kind: ParamKind,
    default: Option<DefaultFn>,
}

impl Parameter {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn kind(&self) -> ParamKind {
        self.kind
    }

    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }
}

impl fmt::Debug for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parameter")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("has_default", &self.has_default())
            .finish()
    }
}

/// The declared parameter list of a function.
#[derive(Debug, Clone)]
pub struct Signature {
    function: &'static str,
    params: Vec<Parameter>,
}

impl Signature {
    /// Starts an empty parameter list for `function`.
    pub fn new(function: &'static str) -> Self {
        Self {
            function,
            params: Vec::new(),
        }
    }

    /// Declares a required positional-or-keyword parameter.
    pub fn param(self, name: &'static str) -> Self {
        self.push(name, ParamKind::PositionalOrKeyword, None)
    }

    /// Declares a positional-or-keyword parameter with a default value.
    ///
    /// The default is cloned for every call that omits it.
    pub fn param_or<T>(self, name: &'static str, default: T) -> Self
    where
        T: Clone + Send + Sync + 'static,
    {
        self.push(name, ParamKind::PositionalOrKeyword, Some(default_fn(default)))
    }

    /// Declares the parameter collecting surplus positional values.
    pub fn var_args(self, name: &'static str) -> Self {
        self.push(name, ParamKind::VarPositional, None)
    }

    /// Declares a required keyword-only parameter.
    pub fn kw_only(self, name: &'static str) -> Self {
        self.push(name, ParamKind::KeywordOnly, None)
    }

    /// Declares a keyword-only parameter with a default value.
    pub fn kw_only_or<T>(self, name: &'static str, default: T) -> Self
    where
        T: Clone + Send + Sync + 'static,
    {
        self.push(name, ParamKind::KeywordOnly, Some(default_fn(default)))
    }

    /// Declares the parameter collecting unknown keyword values.
    pub fn var_kwargs(self, name: &'static str) -> Self {
        self.push(name, ParamKind::VarKeyword, None)
    }

    pub fn function(&self) -> &'static str {
        self.function
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.params
    }

    /// Whether a parameter called `name` is declared.
    pub fn contains(&self, name: &str) -> bool {
        self.params.iter().any(|p| p.name == name)
    }

    /// Binds `arguments` to the declared parameters and applies defaults.
    ///
    /// # Errors
    ///
    /// One of the binding variants of [`CallbackError`] when the arguments do
    /// not fit: too many positional values, a parameter given twice, an
    /// unknown keyword, or a required parameter left unfilled.
    pub fn bind(&self, arguments: Arguments) -> Result<BoundArguments, CallbackError> {
        let Arguments {
            positional,
            keyword,
        } = arguments;
        let given = positional.len();
        let mut values: Vec<Option<Value>> = self.params.iter().map(|_| None).collect();

        let mut positional = positional.into_iter();
        for (param, value) in self.params.iter().zip(values.iter_mut()) {
            if param.kind != ParamKind::PositionalOrKeyword {
                break;
            }
            match positional.next() {
                Some(arg) => *value = Some(arg),
                None => break,
            }
        }

        let surplus: Vec<Value> = positional.collect();
        match self.position_of(ParamKind::VarPositional) {
            Some(index) => values[index] = Some(Box::new(surplus)),
            None if !surplus.is_empty() => {
                return Err(CallbackError::TooManyPositional {
                    function: self.function.to_string(),
                    expected: self.count(ParamKind::PositionalOrKeyword),
                    given,
                });
            }
            None => {}
        }

        let mut extra_keywords: Vec<(String, Value)> = Vec::new();
        for (name, arg) in keyword {
            let target = self.params.iter().position(|p| {
                p.name == name
                    && matches!(
                        p.kind,
                        ParamKind::PositionalOrKeyword | ParamKind::KeywordOnly
                    )
            });
            match target {
                Some(index) if values[index].is_some() => {
                    return Err(CallbackError::MultipleValues {
                        function: self.function.to_string(),
                        parameter: name,
                    });
                }
                Some(index) => values[index] = Some(arg),
                None => extra_keywords.push((name, arg)),
            }
        }

        match self.position_of(ParamKind::VarKeyword) {
            Some(index) => values[index] = Some(Box::new(extra_keywords)),
            None => {
                if let Some((name, _)) = extra_keywords.into_iter().next() {
                    return Err(CallbackError::UnexpectedKeyword {
                        function: self.function.to_string(),
                        parameter: name,
                    });
                }
            }
        }

        let mut slots = Vec::with_capacity(self.params.len());
        for (param, value) in self.params.iter().zip(values) {
            let value = match (value, &param.default) {
                (Some(value), _) => value,
                (None, Some(default)) => default(),
                (None, None) => {
                    return Err(CallbackError::MissingArgument {
                        function: self.function.to_string(),
                        parameter: param.name.to_string(),
                    });
                }
            };
            slots.push(BoundSlot {
                name: param.name,
                kind: param.kind,
                value: Some(value),
            });
        }

        Ok(BoundArguments {
            function: self.function,
            slots,
        })
    }

    fn push(mut self, name: &'static str, kind: ParamKind, default: Option<DefaultFn>) -> Self {
        debug_assert!(!self.contains(name), "duplicate parameter '{name}'");
        self.params.push(Parameter {
            name,
            kind,
            default,
        });
        self
    }

    fn position_of(&self, kind: ParamKind) -> Option<usize> {
        self.params.iter().position(|p| p.kind == kind)
    }

    fn count(&self, kind: ParamKind) -> usize {
        self.params.iter().filter(|p| p.kind == kind).count()
    }
}

fn default_fn<T>(default: T) -> DefaultFn
where
    T: Clone + Send + Sync + 'static,
{
    Arc::new(move || Box::new(default.clone()) as Value)
}

/// The positional and keyword values of one call.
#[derive(Default)]
pub struct Arguments {
    positional: Vec<Value>,
    keyword: Vec<(String, Value)>,
}

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a positional value.
    pub fn arg<T: Send + 'static>(self, value: T) -> Self {
        self.arg_value(Box::new(value))
    }

    /// Appends a keyword value.
    pub fn kwarg<T: Send + 'static>(self, name: impl Into<String>, value: T) -> Self {
        self.kwarg_value(name, Box::new(value))
    }

    /// Appends an already type-erased positional value.
    pub fn arg_value(mut self, value: Value) -> Self {
        self.positional.push(value);
        self
    }

    /// Appends an already type-erased keyword value.
    pub fn kwarg_value(mut self, name: impl Into<String>, value: Value) -> Self {
        self.keyword.push((name.into(), value));
        self
    }

    pub fn positional_len(&self) -> usize {
        self.positional.len()
    }

    pub fn keyword_names(&self) -> impl Iterator<Item = &str> {
        self.keyword.iter().map(|(name, _)| name.as_str())
    }
}

impl fmt::Debug for Arguments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arguments")
            .field("positional", &self.positional.len())
            .field("keyword", &self.keyword_names().collect::<Vec<_>>())
            .finish()
    }
}

struct BoundSlot {
    name: &'static str,
    kind: ParamKind,
    value: Option<Value>,
}

/// Arguments bound to their declared parameters, in declaration order.
pub struct BoundArguments {
    function: &'static str,
    slots: Vec<BoundSlot>,
}

impl BoundArguments {
    /// Name of the function these arguments were bound for.
    pub fn function(&self) -> &'static str {
        self.function
    }

    /// Parameter names that currently hold a value.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.slots
            .iter()
            .filter(|slot| slot.value.is_some())
            .map(|slot| slot.name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.slot(name).is_some_and(|slot| slot.value.is_some())
    }

    /// Borrows the value bound to `name`.
    ///
    /// # Errors
    ///
    /// [`CallbackError::MissingArgument`] if nothing is bound to `name`,
    /// [`CallbackError::ArgumentType`] if the value is not a `T`.
    pub fn get<T: 'static>(&self, name: &str) -> Result<&T, CallbackError> {
        let value = self
            .slot(name)
            .and_then(|slot| slot.value.as_ref())
            .ok_or_else(|| self.missing(name))?;
        value
            .downcast_ref::<T>()
            .ok_or_else(|| mismatch::<T>(name))
    }

    /// Mutably borrows the value bound to `name`.
    ///
    /// # Errors
    ///
    /// Same as [`BoundArguments::get`].
    pub fn get_mut<T: 'static>(&mut self, name: &str) -> Result<&mut T, CallbackError> {
        let missing = self.missing(name);
        let value = self
            .slots
            .iter_mut()
            .find(|slot| slot.name == name)
            .and_then(|slot| slot.value.as_mut())
            .ok_or(missing)?;
        value
            .downcast_mut::<T>()
            .ok_or_else(|| mismatch::<T>(name))
    }

    /// Moves the value bound to `name` out, leaving the slot empty.
    ///
    /// On a type mismatch the value stays where it was.
    ///
    /// # Errors
    ///
    /// Same as [`BoundArguments::get`].
    pub fn take<T: 'static>(&mut self, name: &str) -> Result<T, CallbackError> {
        let value = self.take_value(name)?;
        match value.downcast::<T>() {
            Ok(value) => Ok(*value),
            Err(value) => {
                self.replace(name, value);
                Err(mismatch::<T>(name))
            }
        }
    }

    /// Moves the type-erased value bound to `name` out.
    ///
    /// # Errors
    ///
    /// [`CallbackError::MissingArgument`] if nothing is bound to `name`.
    pub fn take_value(&mut self, name: &str) -> Result<Value, CallbackError> {
        let missing = self.missing(name);
        self.slots
            .iter_mut()
            .find(|slot| slot.name == name)
            .and_then(|slot| slot.value.take())
            .ok_or(missing)
    }

    /// Puts `value` into the slot for `name`, returning the previous value.
    ///
    /// Names that are not declared parameters are ignored and handed back.
    pub fn replace(&mut self, name: &str, value: Value) -> Option<Value> {
        match self.slots.iter_mut().find(|slot| slot.name == name) {
            Some(slot) => slot.value.replace(value),
            None => Some(value),
        }
    }

    /// Expands the bound values back into call arguments.
    ///
    /// Positional-or-keyword values are passed by position until the first
    /// empty slot and by name after it; var-positional values are spread as
    /// positional values, keyword-only and var-keyword values are passed by
    /// name. Binding the result against the same signature yields the same
    /// mapping.
    pub fn into_arguments(self) -> Arguments {
        let mut arguments = Arguments::new();
        let mut by_position = true;

        for slot in self.slots {
            let Some(value) = slot.value else {
                by_position = false;
                continue;
            };
            match slot.kind {
                ParamKind::PositionalOrKeyword if by_position => {
                    arguments = arguments.arg_value(value);
                }
                ParamKind::PositionalOrKeyword | ParamKind::KeywordOnly => {
                    arguments = arguments.kwarg_value(slot.name, value);
                }
                ParamKind::VarPositional => match value.downcast::<Vec<Value>>() {
                    Ok(values) if by_position => {
                        for value in *values {
                            arguments = arguments.arg_value(value);
                        }
                    }
                    // Spreading here would shift the surplus into named slots.
                    Ok(_) => {}
                    Err(value) => arguments = arguments.kwarg_value(slot.name, value),
                },
                ParamKind::VarKeyword => match value.downcast::<Vec<(String, Value)>>() {
                    Ok(values) => {
                        for (name, value) in *values {
                            arguments = arguments.kwarg_value(name, value);
                        }
                    }
                    Err(value) => arguments = arguments.kwarg_value(slot.name, value),
                },
            }
        }

        arguments
    }

    fn slot(&self, name: &str) -> Option<&BoundSlot> {
        self.slots.iter().find(|slot| slot.name == name)
    }

    fn missing(&self, name: &str) -> CallbackError {
        CallbackError::MissingArgument {
            function: self.function.to_string(),
            parameter: name.to_string(),
        }
    }
}

impl fmt::Debug for BoundArguments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundArguments")
            .field("function", &self.function)
            .field("names", &self.names().collect::<Vec<_>>())
            .finish()
    }
}

fn mismatch<T>(name: &str) -> CallbackError {
    CallbackError::ArgumentType {
        parameter: name.to_string(),
        expected: type_name::<T>(),
    }
}
