//! Generic-signature remapping.
//!
//! `Signature` attributes and `LocalVariableTypeTable` entries embed class
//! names inside the generic-signature grammar, so renaming a class must
//! rewrite them. This is a single-pass recursive-descent walk that copies
//! structure verbatim and substitutes class names as they are crossed.
//! Inner-class suffixes (`Louter.Inner;`) are mapped through the composed
//! nested name (`outer$Inner`) and re-emitted as the simple tail of the
//! mapped result.

use crate::error::{ClassFileError, ClassFileResult};

/// Rewrites every class name in a class, method, or field signature.
pub fn remap_signature<F: FnMut(&str) -> String>(sig: &str, map: F) -> ClassFileResult<String> {
    let mut w = SigRemapper {
        src: sig,
        bytes: sig.as_bytes(),
        pos: 0,
        out: String::with_capacity(sig.len()),
        map,
    };
    w.signature()?;
    if w.pos != w.bytes.len() {
        return Err(w.err());
    }
    Ok(w.out)
}

struct SigRemapper<'a, F> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
    out: String,
    map: F,
}

impl<F: FnMut(&str) -> String> SigRemapper<'_, F> {
    fn err(&self) -> ClassFileError {
        ClassFileError::BadSignature(self.src.to_string())
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    /// Copies one expected ASCII structure character.
    fn expect(&mut self, b: u8) -> ClassFileResult<()> {
        if self.peek() != Some(b) {
            return Err(self.err());
        }
        self.out.push(b as char);
        self.pos += 1;
        Ok(())
    }

    /// Reads an identifier segment up to `<`, `;` or `.` without copying it.
    /// Identifier bytes may be non-ASCII; the delimiters are ASCII, so byte
    /// scanning stays UTF-8 safe.
    fn scan_name(&mut self) -> ClassFileResult<&'_ str> {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if matches!(b, b'<' | b';' | b'.') {
                break;
            }
            self.pos += 1;
        }
        if self.pos == start {
            return Err(self.err());
        }
        Ok(&self.src[start..self.pos])
    }

    fn signature(&mut self) -> ClassFileResult<()> {
        if self.peek() == Some(b'<') {
            self.formal_type_params()?;
        }
        if self.peek() == Some(b'(') {
            // Method signature.
            self.expect(b'(')?;
            while self.peek() != Some(b')') {
                self.java_type()?;
            }
            self.expect(b')')?;
            if self.peek() == Some(b'V') {
                self.expect(b'V')?;
            } else {
                self.java_type()?;
            }
            while self.peek() == Some(b'^') {
                self.expect(b'^')?;
                if self.peek() == Some(b'T') {
                    self.type_var()?;
                } else {
                    self.class_type()?;
                }
            }
        } else {
            // Class signature (superclass + interfaces) or field signature.
            self.ref_type()?;
            while self.pos < self.bytes.len() {
                self.class_type()?;
            }
        }
        Ok(())
    }

    fn formal_type_params(&mut self) -> ClassFileResult<()> {
        self.expect(b'<')?;
        while self.peek() != Some(b'>') {
            // Identifier up to the first bound separator.
            let start = self.pos;
            while self.peek().is_some_and(|b| b != b':') {
                self.pos += 1;
            }
            if self.pos == start || self.peek().is_none() {
                return Err(self.err());
            }
            let ident = &self.src[start..self.pos];
            self.out.push_str(ident);
            // Class bound (may be empty) followed by interface bounds.
            self.expect(b':')?;
            if matches!(self.peek(), Some(b'L' | b'T' | b'[')) {
                self.ref_type()?;
            }
            while self.peek() == Some(b':') {
                self.expect(b':')?;
                self.ref_type()?;
            }
        }
        self.expect(b'>')
    }

    fn java_type(&mut self) -> ClassFileResult<()> {
        match self.peek() {
            Some(b @ (b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z')) => self.expect(b),
            _ => self.ref_type(),
        }
    }

    fn ref_type(&mut self) -> ClassFileResult<()> {
        match self.peek() {
            Some(b'[') => {
                self.expect(b'[')?;
                self.java_type()
            }
            Some(b'T') => self.type_var(),
            Some(b'L') => self.class_type(),
            _ => Err(self.err()),
        }
    }

    fn type_var(&mut self) -> ClassFileResult<()> {
        self.expect(b'T')?;
        let name = self.scan_name()?.to_string();
        self.out.push_str(&name);
        self.expect(b';')
    }

    fn class_type(&mut self) -> ClassFileResult<()> {
        self.expect(b'L')?;
        let mut qualified = self.scan_name()?.to_string();
        let mapped = (self.map)(&qualified);
        self.out.push_str(&mapped);
        loop {
            if self.peek() == Some(b'<') {
                self.type_args()?;
            }
            match self.peek() {
                Some(b';') => return self.expect(b';'),
                Some(b'.') => {
                    self.expect(b'.')?;
                    let simple = self.scan_name()?.to_string();
                    qualified.push('$');
                    qualified.push_str(&simple);
                    let mapped = (self.map)(&qualified);
                    let tail = mapped.rsplit(['$', '/']).next().unwrap_or(&mapped);
                    self.out.push_str(tail);
                }
                _ => return Err(self.err()),
            }
        }
    }

    fn type_args(&mut self) -> ClassFileResult<()> {
        self.expect(b'<')?;
        while self.peek() != Some(b'>') {
            match self.peek() {
                Some(b'*') => self.expect(b'*')?,
                Some(b @ (b'+' | b'-')) => {
                    self.expect(b)?;
                    self.ref_type()?;
                }
                _ => self.ref_type()?,
            }
        }
        self.expect(b'>')
    }
}
