#![allow(dead_code)]

use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

use rox::error::LoxError;
use rox::lox::{Lox, Outcome};

/// A `Write` sink the test keeps a handle to after giving it away.
#[derive(Clone, Default)]
pub struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl SharedBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8(self.0.borrow().clone()).expect("interpreter output is UTF-8")
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A session plus a handle on everything it prints.
pub fn session() -> (Lox, SharedBuffer) {
    let buffer = SharedBuffer::default();
    let lox = Lox::with_output(Box::new(buffer.clone()));
    (lox, buffer)
}

/// Run `source` in a fresh session; returns the outcome and the printed text.
pub fn run(source: &str) -> (Outcome, String) {
    let (mut lox, buffer) = session();
    let outcome = lox.run(source);
    (outcome, buffer.contents())
}

/// Run `source`, which must succeed, and return its printed lines.
pub fn output_of(source: &str) -> Vec<String> {
    let (outcome, output) = run(source);
    assert!(outcome.is_success(), "expected success, got {:?}", outcome);
    output.lines().map(str::to_owned).collect()
}

/// Run `source`, which must fail at runtime, and return the message.
pub fn runtime_error_of(source: &str) -> String {
    match run(source).0 {
        Outcome::RuntimeError(e) => e.message,
        other => panic!("expected a runtime error, got {:?}", other),
    }
}

/// Run `source`, which must fail to compile, and return the rendered errors.
pub fn compile_errors_of(source: &str) -> Vec<String> {
    match run(source).0 {
        Outcome::CompileError(errors) => errors.iter().map(LoxError::to_string).collect(),
        other => panic!("expected compile errors, got {:?}", other),
    }
}
