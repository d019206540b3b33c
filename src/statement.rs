use crate::error::{Error, Result};
use crate::value::Value;

/// A server-side prepared statement handle.
///
/// Owned by the connection that prepared it; pass it back to that
/// connection's `execute` / `close_statement`. Closing releases the server
/// resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Statement {
    id: u32,
    num_params: u16,
    num_columns: u16,
}

impl Statement {
    pub(crate) fn new(id: u32, num_params: u16, num_columns: u16) -> Self {
        Self {
            id,
            num_params,
            num_columns,
        }
    }

    /// The server-assigned statement id.
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Number of `?` placeholders in the statement.
    pub fn num_params(&self) -> u16 {
        self.num_params
    }

    /// Number of columns the statement produces.
    pub fn num_columns(&self) -> u16 {
        self.num_columns
    }

    /// Verify a parameter list against the statement's placeholder count.
    pub(crate) fn check_params(&self, params: &[Value<'_>]) -> Result<()> {
        if params.len() != self.num_params as usize {
            return Err(Error::WrongNumParams {
                expected: self.num_params,
                actual: params.len(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn param_count_check() {
        let stmt = Statement::new(1, 2, 1);
        assert!(stmt.check_params(&[Value::Int(1), Value::Int(2)]).is_ok());
        assert!(matches!(
            stmt.check_params(&[Value::Int(1)]),
            Err(Error::WrongNumParams {
                expected: 2,
                actual: 1
            })
        ));
    }
}
