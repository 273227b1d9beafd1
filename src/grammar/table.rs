use std::collections::BTreeMap;

use log::warn;

use super::{Grammar, RuleId, SymbolId};

/// A table entry that was claimed by two different rules
///
/// The entry keeps the later rule. A grammar with conflicts is not LL(1), and parses that reach
/// the entry may pick the wrong alternative.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Conflict {
    pub head: SymbolId,
    pub lookahead: SymbolId,
    pub replaced: RuleId,
    pub by: RuleId,
}

/// Predictive parse table mapping (nonterminal, lookahead terminal) pairs to rules
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParseTable {
    rows: BTreeMap<SymbolId, BTreeMap<SymbolId, RuleId>>,
    conflicts: Vec<Conflict>,
}

impl ParseTable {
    pub(super) fn build(grammar: &Grammar) -> Self {
        let mut table = Self::default();

        for rule in grammar.rules() {
            for lookahead in grammar.first_of(rule.body()) {
                table.insert(grammar, rule.head(), lookahead, rule.id());
            }

            // The body can derive nothing, so anything that follows the head selects it
            if rule.body().iter().all(|symbol| grammar.symbol(*symbol).is_nullable()) {
                for lookahead in grammar.symbol(rule.head()).follow() {
                    table.insert(grammar, rule.head(), lookahead, rule.id());
                }
            }
        }

        table
    }

    fn insert(&mut self, grammar: &Grammar, head: SymbolId, lookahead: SymbolId, rule: RuleId) {
        let replaced = self.rows.entry(head).or_default().insert(lookahead, rule);

        if let Some(replaced) = replaced.filter(|replaced| *replaced != rule) {
            warn!(
                "LL(1) conflict for {} on {}: [{}] replaced by [{}]",
                grammar.symbol(head),
                grammar.symbol(lookahead),
                grammar.display_rule(grammar.rule(replaced)),
                grammar.display_rule(grammar.rule(rule)),
            );

            self.conflicts.push(Conflict {
                head,
                lookahead,
                replaced,
                by: rule,
            });
        }
    }

    pub fn get(&self, head: SymbolId, lookahead: SymbolId) -> Option<RuleId> {
        self.rows.get(&head)?.get(&lookahead).copied()
    }

    /// Lookahead terminals that have an entry for `head`
    pub fn expected(&self, head: SymbolId) -> impl Iterator<Item = SymbolId> + '_ {
        self.rows.get(&head).into_iter().flat_map(|row| row.keys().copied())
    }

    pub fn conflicts(&self) -> &[Conflict] {
        &self.conflicts
    }

    pub fn len(&self) -> usize {
        self.rows.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use crate::grammar::{Grammar, GrammarError, RuleDecl};

    #[test]
    fn later_rules_win_conflicts() -> Result<(), GrammarError> {
        let rules = [
            RuleDecl::new("#s", ["x", "y"]),
            RuleDecl::new("#s", ["x", "z"]),
        ];
        let grammar = Grammar::compile("#s", rules)?;
        let s = grammar.symbol_id("#s").unwrap();
        let x = grammar.symbol_id("x").unwrap();
        let conflicts = grammar.conflicts();

        assert_eq!(grammar.table().get(s, x), Some(grammar.rules()[1].id()));
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].replaced, grammar.rules()[0].id());
        assert_eq!(conflicts[0].by, grammar.rules()[1].id());

        Ok(())
    }

    #[test]
    fn expected_lookaheads() -> Result<(), GrammarError> {
        let rules = [RuleDecl::new("#s", ["a"]), RuleDecl::new("#s", ["b"])];
        let grammar = Grammar::compile("#s", rules)?;
        let s = grammar.symbol_id("#s").unwrap();
        let names: Vec<_> = grammar
            .table()
            .expected(s)
            .map(|symbol| grammar.symbol(symbol).name())
            .collect();

        assert_eq!(names, ["a", "b"]);
        assert_eq!(grammar.table().len(), 2);
        assert!(grammar.table().expected(grammar.end()).next().is_none());

        Ok(())
    }
}
