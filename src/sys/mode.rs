use tracing::trace;

use crate::errors::{AmResult, ModeError};

/// Mode bit flagging the subject as a directory
///
/// Carried on the raw mode word outside the 9 permission bits and consumed only by the
/// conditional execute rule. Always masked off before mapping a mode to an access list.
pub const MODE_DIR: u32 = 0o40000;

/// Owner positions of a permission mask
pub const WHO_USER: u32 = 0o700;

/// Group positions of a permission mask
pub const WHO_GROUP: u32 = 0o070;

/// Other positions of a permission mask
pub const WHO_OTHER: u32 = 0o007;

/// All principal positions of a permission mask
pub const WHO_ALL: u32 = 0o777;

/// Read permission request flag
pub const PERM_R: u32 = 0o1;

/// Write permission request flag
pub const PERM_W: u32 = 0o2;

/// Execute permission request flag
pub const PERM_X: u32 = 0o4;

/// Conditional execute permission request flag i.e. the symbolic `X`
///
/// Grants execute only when the subject is a directory or already has at least one execute bit
/// set in any principal position.
pub const PERM_CX: u32 = 0o10;

/// Operator of a single mode change action
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ModeOp {
    /// Grant the requested permissions on top of the existing mask i.e. `+`
    Add,

    /// Revoke the requested permissions from the existing mask i.e. `-`
    Remove,

    /// Replace the targeted principal positions with the requested permissions i.e. `=`
    Set,
}

/// A single parsed clause of a symbolic mode expression
///
/// * `who` is a union of the `WHO_USER`, `WHO_GROUP` and `WHO_OTHER` position masks and is
///   never empty once parsing succeeds, defaulting to `WHO_ALL`
/// * `perm` is a union of the `PERM_R`, `PERM_W`, `PERM_X` and `PERM_CX` request flags
/// * `reference` names another principal's position mask whose current bits are copied in as an
///   additional permission source e.g. `g=u`
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct ModeAction {
    /// Principal positions the action applies to
    pub who: u32,

    /// Operator to apply
    pub op: ModeOp,

    /// Requested permission flags
    pub perm: u32,

    /// Referenced principal position mask or 0 for none
    pub reference: u32,
}

/// An ordered sequence of mode change actions parsed from a symbolic expression
///
/// Actions are applied strictly left to right, each seeing the mask produced by the previous
/// one. Immutable once parsed.
///
/// ### Examples
/// ```
/// use aclmod::prelude::*;
///
/// let expr = sys::parse_symbolic("a+r,u+wx").unwrap();
/// assert_eq!(expr.len(), 2);
/// assert_eq!(expr.apply(0o000), 0o744);
/// ```
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct ModeExpression(Vec<ModeAction>);

impl ModeExpression {
    /// Returns the number of actions in the expression
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the expression contains no actions
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns an iterator over the actions in application order
    pub fn iter(&self) -> std::slice::Iter<'_, ModeAction> {
        self.0.iter()
    }

    /// Fold all actions into the given mode in order, producing the final mask
    ///
    /// * `old` may carry the `MODE_DIR` flag which feeds the conditional execute rule
    /// * The result is not masked so callers deciding to persist it should mask to `0o777`
    ///
    /// ### Examples
    /// ```
    /// use aclmod::prelude::*;
    ///
    /// let expr = sys::parse_symbolic("u+r-w").unwrap();
    /// assert_eq!(expr.apply(0o200), 0o400);
    /// ```
    pub fn apply(&self, old: u32) -> u32 {
        let mut mode = old;
        for action in self.iter() {
            mode = compute_mode(mode, action);
            trace!("folded mode action to {:o}", mode);
        }
        mode
    }
}

/// Parse a 3 or 4 digit octal string into a 9 bit permission mask
///
/// * Each character must be in `0-7`
/// * A 4 digit mode's leading digit is discarded since the target access control model has no
///   equivalent of setuid/setgid and the sticky bit
/// * The result never carries the `MODE_DIR` flag, that is determined per path later
///
/// ### Errors
/// * ModeError::InvalidOctal when the length is wrong or a character is out of range
///
/// ### Examples
/// ```
/// use aclmod::prelude::*;
///
/// assert_eq!(sys::parse_octal("755").unwrap(), 0o755);
/// assert_eq!(sys::parse_octal("0755").unwrap(), 0o755);
/// assert!(sys::parse_octal("75").is_err());
/// ```
pub fn parse_octal(mask: &str) -> AmResult<u32> {
    let len = mask.chars().count();
    if len != 3 && len != 4 {
        return Err(ModeError::InvalidOctal(mask.to_string()).into());
    }
    if !mask.chars().all(|c| ('0'..='7').contains(&c)) {
        return Err(ModeError::InvalidOctal(mask.to_string()).into());
    }

    // All characters are single byte octal digits at this point so byte slicing is safe
    let digits = if len == 4 { &mask[1..] } else { mask };
    match u32::from_str_radix(digits, 8) {
        Ok(mode) if mode <= 0o777 => Ok(mode),
        _ => Err(ModeError::InvalidOctal(mask.to_string()).into()),
    }
}

// Symbolic mode parser states. Strictly forward with fall through on unrecognized characters,
// except End which loops back to Who for the next clause or chained action.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum State {
    Who,
    Op,
    Perm,
    Ref,
    End,
}

/// Parse a symbolic mode expression into an ordered sequence of change actions
///
/// The grammar follows the usual chmod form:
/// * `mode ::= clause (',' clause)*`
/// * `clause ::= who* (op perm* | op ref)+`
/// * `who ::= 'a'|'u'|'g'|'o'`, `op ::= '+'|'-'|'='`, `perm ::= 'r'|'w'|'x'|'X'`, `ref ::= 'u'|'g'|'o'`
///
/// A clause without a `who` prefix targets all three principals. An operator directly after a
/// completed action reuses the same `who` so `u+r-w` means user add read then remove write. A
/// trailing clause with no permissions and no reference e.g. `u+` is a legal no-op.
///
/// ### Errors
/// * ModeError::InvalidOp when a clause is missing its operator
/// * ModeError::InvalidMode on trailing garbage or an operator chained onto an empty action
///
/// Any error discards all actions accumulated so far; the caller never sees a partial result.
///
/// ### Examples
/// ```
/// use aclmod::prelude::*;
///
/// let expr = sys::parse_symbolic("ug+rw").unwrap();
/// assert_eq!(expr.len(), 1);
/// assert!(sys::parse_symbolic("u~r").is_err());
/// ```
pub fn parse_symbolic(mode: &str) -> AmResult<ModeExpression> {
    let chars: Vec<char> = mode.chars().collect();
    let mut actions: Vec<ModeAction> = Vec::new();

    let mut state = State::Who;
    let mut who = 0;
    let mut op: Option<ModeOp> = None;
    let mut perm = 0;
    let mut reference = 0;
    let mut i = 0;

    // One extra iteration past the last character finalizes the trailing action
    while i <= chars.len() {
        let c = chars.get(i).copied();
        match state {
            State::Who => match c {
                Some('a') => {
                    who |= WHO_ALL;
                    i += 1;
                },
                Some('u') => {
                    who |= WHO_USER;
                    i += 1;
                },
                Some('g') => {
                    who |= WHO_GROUP;
                    i += 1;
                },
                Some('o') => {
                    who |= WHO_OTHER;
                    i += 1;
                },
                _ => state = State::Op,
            },
            State::Op => {
                op = match c {
                    Some('+') => Some(ModeOp::Add),
                    Some('-') => Some(ModeOp::Remove),
                    Some('=') => Some(ModeOp::Set),
                    _ => return Err(ModeError::InvalidOp(mode.to_string()).into()),
                };
                i += 1;
                state = State::Perm;
            },
            State::Perm => match c {
                Some('r') => {
                    perm |= PERM_R;
                    i += 1;
                },
                Some('w') => {
                    perm |= PERM_W;
                    i += 1;
                },
                Some('x') => {
                    perm |= PERM_X;
                    i += 1;
                },
                Some('X') => {
                    perm |= PERM_CX;
                    i += 1;
                },
                _ => state = State::Ref,
            },
            State::Ref => match c {
                // Last reference wins when repeated
                Some('u') => {
                    reference = WHO_USER;
                    i += 1;
                },
                Some('g') => {
                    reference = WHO_GROUP;
                    i += 1;
                },
                Some('o') => {
                    reference = WHO_OTHER;
                    i += 1;
                },
                _ => state = State::End,
            },
            State::End => match c {
                None | Some(',') | Some('+') | Some('-') | Some('=') => {
                    let chained = matches!(c, Some('+') | Some('-') | Some('='));

                    // An operator chained onto an action that requested nothing is a double
                    // operator e.g. `u++r` rather than a degenerate no-op
                    if chained && perm == 0 && reference == 0 {
                        return Err(ModeError::InvalidMode(mode.to_string()).into());
                    }

                    let action = ModeAction {
                        who: if who == 0 { WHO_ALL } else { who },
                        op: op.take().ok_or_else(|| ModeError::InvalidOp(mode.to_string()))?,
                        perm,
                        reference,
                    };
                    let last_who = action.who;
                    actions.push(action);

                    perm = 0;
                    reference = 0;
                    if chained {
                        // Chained action reuses the same who; the operator is left in place to
                        // be consumed on the next pass through the Op state
                        who = last_who;
                    } else {
                        who = 0;
                        i += 1;
                    }
                    state = State::Who;
                },
                _ => return Err(ModeError::InvalidMode(mode.to_string()).into()),
            },
        }
    }

    Ok(ModeExpression(actions))
}

/// Compute a new mode from the old mode and a single mode change action
///
/// * Requested permissions are replicated across all three principal positions then restricted
///   to the positions named by the action's `who`
/// * A reference copies the referenced principal's current bits as another permission source
/// * `PERM_CX` contributes execute only for directories or when `old` already has an execute
///   bit in any position
///
/// Note that `Set` replaces the whole mask with the who-restricted candidate, so `u=rwx`
/// clears any group and other bits the old mask carried.
///
/// ### Examples
/// ```
/// use aclmod::prelude::*;
///
/// let expr = sys::parse_symbolic("u+rwx").unwrap();
/// let action = expr.iter().next().unwrap();
/// assert_eq!(sys::compute_mode(0o644, action), 0o744);
/// ```
pub fn compute_mode(old: u32, action: &ModeAction) -> u32 {
    const READ_MASK: u32 = 0o444;
    const WRITE_MASK: u32 = 0o222;
    const EXE_MASK: u32 = 0o111;

    // Degenerate no-op action
    if action.perm == 0 && action.reference == 0 {
        return old;
    }

    let mut mask = 0;
    if action.perm & PERM_R != 0 {
        mask |= READ_MASK;
    }
    if action.perm & PERM_W != 0 {
        mask |= WRITE_MASK;
    }
    if action.perm & PERM_X != 0 {
        mask |= EXE_MASK;
    }
    if action.perm & PERM_CX != 0 && (old & MODE_DIR != 0 || old & EXE_MASK != 0) {
        mask |= EXE_MASK;
    }

    // A reference copies the referenced principal's current rwx pattern, replicated across all
    // three positions the same way literal permissions are, before the who restriction
    if action.reference != 0 {
        let pattern = match action.reference {
            WHO_USER => (old & WHO_USER) >> 6,
            WHO_GROUP => (old & WHO_GROUP) >> 3,
            _ => old & WHO_OTHER,
        };
        mask |= pattern * EXE_MASK;
    }

    mask &= action.who;

    match action.op {
        ModeOp::Set => mask,
        ModeOp::Remove => old & !mask,
        ModeOp::Add => old | mask,
    }
}

// Unit tests
// -------------------------------------------------------------------------------------------------
#[cfg(test)]
mod tests {
    use crate::prelude::*;

    #[test]
    fn test_parse_octal() {
        assert_eq!(sys::parse_octal("755").unwrap(), 0o755);
        assert_eq!(sys::parse_octal("0755").unwrap(), 0o755);
        assert_eq!(sys::parse_octal("000").unwrap(), 0o000);
        assert_eq!(sys::parse_octal("777").unwrap(), 0o777);

        // Leading digit of a 4 digit mode is discarded
        assert_eq!(sys::parse_octal("7777").unwrap(), 0o777);
        assert_eq!(sys::parse_octal("4644").unwrap(), 0o644);

        // Wrong length
        assert!(sys::parse_octal("").is_err());
        assert!(sys::parse_octal("75").is_err());
        assert!(sys::parse_octal("07555").is_err());

        // Out of range characters
        assert!(sys::parse_octal("758").is_err());
        assert!(sys::parse_octal("seven").is_err());
        assert!(sys::parse_octal("-75").is_err());

        // Error kind
        assert_eq!(
            sys::parse_octal("888").unwrap_err().downcast_ref::<ModeError>(),
            Some(&ModeError::InvalidOctal("888".to_string()))
        );
    }

    #[test]
    fn test_parse_symbolic_single_clause() {
        let expr = sys::parse_symbolic("u+r").unwrap();
        assert_eq!(expr.len(), 1);
        let action = expr.iter().next().unwrap();
        assert_eq!(action.who, WHO_USER);
        assert_eq!(action.op, ModeOp::Add);
        assert_eq!(action.perm, PERM_R);
        assert_eq!(action.reference, 0);

        let expr = sys::parse_symbolic("go-wx").unwrap();
        let action = expr.iter().next().unwrap();
        assert_eq!(action.who, WHO_GROUP | WHO_OTHER);
        assert_eq!(action.op, ModeOp::Remove);
        assert_eq!(action.perm, PERM_W | PERM_X);

        let expr = sys::parse_symbolic("o=X").unwrap();
        let action = expr.iter().next().unwrap();
        assert_eq!(action.who, WHO_OTHER);
        assert_eq!(action.op, ModeOp::Set);
        assert_eq!(action.perm, PERM_CX);
    }

    #[test]
    fn test_parse_symbolic_who_defaults_to_all() {
        let all = sys::parse_symbolic("a+rwx").unwrap();
        let ugo = sys::parse_symbolic("ugo+rwx").unwrap();
        let none = sys::parse_symbolic("+rwx").unwrap();
        assert_eq!(all, ugo);
        assert_eq!(all, none);

        let action = all.iter().next().unwrap();
        assert_eq!(action.who, WHO_ALL);
        assert_eq!(action.perm, PERM_R | PERM_W | PERM_X);
    }

    #[test]
    fn test_parse_symbolic_chained_and_comma_clauses() {
        let expr = sys::parse_symbolic("u+r-w,go=rx").unwrap();
        assert_eq!(expr.len(), 3);

        let mut iter = expr.iter();
        let action = iter.next().unwrap();
        assert_eq!((action.who, action.op, action.perm), (WHO_USER, ModeOp::Add, PERM_R));

        // Chained action reuses the same who without repeating `u`
        let action = iter.next().unwrap();
        assert_eq!((action.who, action.op, action.perm), (WHO_USER, ModeOp::Remove, PERM_W));

        // Comma resets the who for the next clause
        let action = iter.next().unwrap();
        assert_eq!(
            (action.who, action.op, action.perm),
            (WHO_GROUP | WHO_OTHER, ModeOp::Set, PERM_R | PERM_X)
        );
    }

    #[test]
    fn test_parse_symbolic_reference() {
        let expr = sys::parse_symbolic("g=u").unwrap();
        let action = expr.iter().next().unwrap();
        assert_eq!(action.who, WHO_GROUP);
        assert_eq!(action.op, ModeOp::Set);
        assert_eq!(action.perm, 0);
        assert_eq!(action.reference, WHO_USER);

        // Last reference wins
        let expr = sys::parse_symbolic("g=uo").unwrap();
        assert_eq!(expr.iter().next().unwrap().reference, WHO_OTHER);
    }

    #[test]
    fn test_parse_symbolic_degenerate_noop() {
        // Trailing action with no permissions and no reference is legal
        let expr = sys::parse_symbolic("u+").unwrap();
        assert_eq!(expr.len(), 1);
        let action = expr.iter().next().unwrap();
        assert_eq!(action.perm, 0);
        assert_eq!(action.reference, 0);
        assert_eq!(expr.apply(0o644), 0o644);
    }

    #[test]
    fn test_parse_symbolic_errors() {
        // Missing operator
        assert!(sys::parse_symbolic("").is_err());
        assert!(sys::parse_symbolic("u").is_err());
        assert!(sys::parse_symbolic("urw").is_err());
        assert_eq!(
            sys::parse_symbolic("u~r").unwrap_err().downcast_ref::<ModeError>(),
            Some(&ModeError::InvalidOp("u~r".to_string()))
        );

        // Double operator
        assert_eq!(
            sys::parse_symbolic("uu++r").unwrap_err().downcast_ref::<ModeError>(),
            Some(&ModeError::InvalidMode("uu++r".to_string()))
        );
        assert!(sys::parse_symbolic("u+-w").is_err());

        // Trailing garbage after a completed action
        assert!(sys::parse_symbolic("u+r;").is_err());
        assert!(sys::parse_symbolic("u+rz").is_err());

        // Trailing comma leaves an empty clause with no operator
        assert!(sys::parse_symbolic("u+r,").is_err());
    }

    #[test]
    fn test_compute_mode_operators() {
        let add = sys::parse_symbolic("u+w").unwrap();
        assert_eq!(add.apply(0o000), 0o200);
        assert_eq!(add.apply(0o100), 0o300);
        assert_eq!(add.apply(0o200), 0o200);

        let sub = sys::parse_symbolic("u-w").unwrap();
        assert_eq!(sub.apply(0o200), 0o000);
        assert_eq!(sub.apply(0o100), 0o100);
        assert_eq!(sub.apply(0o644), 0o444);

        // Set replaces the whole mask with the who-restricted candidate
        let set = sys::parse_symbolic("u=rw").unwrap();
        assert_eq!(set.apply(0o000), 0o600);
        assert_eq!(set.apply(0o100), 0o600);
        assert_eq!(set.apply(0o755), 0o600);
    }

    #[test]
    fn test_compute_mode_idempotent_set() {
        let expr = sys::parse_symbolic("u=rwx").unwrap();
        let once = expr.apply(0o644);
        assert_eq!(once, 0o700);
        assert_eq!(expr.apply(once), once);
    }

    #[test]
    fn test_compute_mode_conditional_execute() {
        // No execute anywhere on a file: X contributes nothing
        let expr = sys::parse_symbolic("a+X").unwrap();
        assert_eq!(expr.apply(0o644), 0o644);

        // Any pre-existing execute bit spreads execute to the named positions
        assert_eq!(expr.apply(0o744), 0o755);

        // Directories always receive execute
        assert_eq!(expr.apply(MODE_DIR | 0o644), MODE_DIR | 0o755);

        // u+x on a file with no execute bits: plain x is unconditional
        let expr = sys::parse_symbolic("u+x").unwrap();
        assert_eq!(expr.apply(0o644), 0o744);

        // u+X on the same file is a no-op
        let expr = sys::parse_symbolic("u+X").unwrap();
        assert_eq!(expr.apply(0o644), 0o644);
    }

    #[test]
    fn test_compute_mode_reference() {
        // Copy the owner's current bits into the group positions
        let expr = sys::parse_symbolic("g=u").unwrap();
        assert_eq!(expr.apply(0o750), 0o070);
        assert_eq!(expr.apply(0o600), 0o060);

        // Add the owner's current bits to the other positions
        let expr = sys::parse_symbolic("o+u").unwrap();
        assert_eq!(expr.apply(0o750), 0o757);

        // Reference and literal permissions accumulate as two sources
        let expr = sys::parse_symbolic("o+ru").unwrap();
        assert_eq!(expr.len(), 1);
        assert_eq!(expr.apply(0o740), 0o747);

        // Remove whatever other currently has from the group positions
        let expr = sys::parse_symbolic("g-o").unwrap();
        assert_eq!(expr.apply(0o775), 0o725);
    }

    #[test]
    fn test_compute_mode_ordering() {
        // Actions see the mask produced by the previous action; the second set here replaces
        // the owner bits the first one granted
        let expr = sys::parse_symbolic("u=rwx,g=u").unwrap();
        assert_eq!(expr.apply(0o000), 0o070);

        let expr = sys::parse_symbolic("a=r,u+wx").unwrap();
        assert_eq!(expr.apply(0o777), 0o744);
    }
}
