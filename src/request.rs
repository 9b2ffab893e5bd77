use crate::{
    bytes::{parse, parse_i64_exact, parse_u64_exact},
    command::{self, Arity, Command},
    reply::ReplyError,
};
use bytes::Bytes;
use std::collections::VecDeque;
use tokio::time::Duration;

/// The current request: its arguments, the resolved command, and a cursor
/// over the arguments consumed so far.
#[derive(Clone, Debug)]
pub struct Request {
    arguments: VecDeque<Bytes>,
    pub command: &'static Command,
    next: usize,
}

impl Default for Request {
    fn default() -> Self {
        Request {
            arguments: VecDeque::new(),
            command: &command::UNKNOWN,
            next: 1,
        }
    }
}

impl Request {
    fn set_command(&mut self) {
        self.command = self
            .get(0)
            .map_or(&command::UNKNOWN, |argument| argument[..].into());
    }

    pub fn next(&self) -> usize {
        self.next
    }

    pub fn reset(&mut self, next: usize) {
        self.next = next;
    }

    pub fn clear(&mut self) {
        self.next = 0;
        self.arguments.clear();
        self.command = &command::UNKNOWN;
    }

    pub fn drain(&mut self) -> impl Iterator<Item = Bytes> + '_ {
        self.arguments.drain(..)
    }

    pub fn push_back(&mut self, argument: Bytes) {
        self.arguments.push_back(argument);
        if self.len() == 1 {
            self.set_command();
            self.next = 1;
        }
    }

    /// Overwrite an argument in place. Blocking stream reads use this to pin
    /// `$` to a concrete id before parking, so a rerun observes the id that
    /// was current when the command first executed.
    pub fn replace(&mut self, index: usize, argument: Bytes) {
        if let Some(slot) = self.arguments.get_mut(index) {
            *slot = argument;
        }
    }

    pub fn len(&self) -> usize {
        self.arguments.len()
    }

    pub fn remaining(&self) -> usize {
        self.arguments.len() - self.next
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn get(&self, index: usize) -> Option<Bytes> {
        self.arguments.get(index).cloned()
    }

    /// Assert that the number of remaining arguments is a factor of 2.
    pub fn assert_pairs(&self) -> Result<(), ReplyError> {
        if self.remaining() % 2 == 0 {
            Ok(())
        } else {
            Err(self.wrong_arguments())
        }
    }

    pub fn is_valid(&self) -> bool {
        use Arity::*;
        match self.command.arity {
            Exact(arity) => self.len() == arity.into(),
            Minimum(arity) => self.len() >= arity.into(),
        }
    }

    pub fn peek(&mut self) -> Option<Bytes> {
        self.get(self.next)
    }

    pub fn pop(&mut self) -> Result<Bytes, ReplyError> {
        self.try_pop().ok_or_else(|| self.wrong_arguments())
    }

    pub fn try_pop(&mut self) -> Option<Bytes> {
        if let Some(argument) = self.peek() {
            self.next += 1;
            Some(argument)
        } else {
            None
        }
    }

    pub fn wrong_arguments(&self) -> ReplyError {
        ReplyError::WrongArguments(self.command)
    }

    pub fn bit(&mut self) -> Result<bool, ReplyError> {
        match &self.pop()?[..] {
            b"0" => Ok(false),
            b"1" => Ok(true),
            _ => Err(ReplyError::BitArgument),
        }
    }

    pub fn bit_offset(&mut self) -> Result<usize, ReplyError> {
        let offset = parse_u64_exact(&self.pop()?).ok_or(ReplyError::BitOffset)?;
        usize::try_from(offset).map_err(|_| ReplyError::BitOffset)
    }

    pub fn i64(&mut self) -> Result<i64, ReplyError> {
        parse_i64_exact(&self.pop()?).ok_or(ReplyError::Integer)
    }

    pub fn u64(&mut self) -> Result<u64, ReplyError> {
        parse_u64_exact(&self.pop()?).ok_or(ReplyError::Integer)
    }

    pub fn usize(&mut self) -> Result<usize, ReplyError> {
        let value = parse_u64_exact(&self.pop()?).ok_or(ReplyError::Integer)?;
        usize::try_from(value).map_err(|_| ReplyError::Integer)
    }

    pub fn f64(&mut self) -> Result<f64, ReplyError> {
        parse(&self.pop()?).ok_or(ReplyError::Float)
    }

    pub fn finite_f64(&mut self) -> Result<f64, ReplyError> {
        let value = self.f64()?;
        if value.is_finite() {
            Ok(value)
        } else {
            Err(ReplyError::Float)
        }
    }

    /// A BLOCK timeout in milliseconds. Zero waits forever.
    pub fn timeout(&mut self) -> Result<Duration, ReplyError> {
        let millis = parse_i64_exact(&self.pop()?).ok_or(ReplyError::InvalidTimeout)?;
        if millis < 0 {
            return Err(ReplyError::NegativeTimeout);
        }
        Ok(Duration::from_millis(millis as u64))
    }
}
