//! SLR(1) table construction.
//!
//! Builds the canonical LR(0) item-set collection by breadth-first search,
//! computes FIRST and FOLLOW by fixed point, and fills the ACTION/GOTO
//! matrices. Reductions are predicted by FOLLOW sets.
//!
//! Conflict policy: a shift/reduce collision always resolves in favour of the
//! shift (this is what gives the dangling `else` its usual binding); the
//! conflict is recorded but does not fail the build. A reduce/reduce
//! collision keeps the later entry and flags the table as conflicted.

use std::collections::{BTreeSet, HashMap};

use indexmap::{IndexMap, IndexSet};

use crate::grammar::{Grammar, EOF_SYMBOL, EPSILON};

/// An LR(0) item: a production with a dot position, no lookahead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Item {
    pub production: usize,
    pub dot: usize,
}

/// A parse action for one `(state, terminal)` cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Shift(usize),
    Reduce(usize),
    Accept(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    ShiftReduce,
    ReduceReduce,
}

/// A recorded table conflict: which entry survived and which was dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub state: usize,
    pub symbol: String,
    pub kind: ConflictKind,
    pub kept: Action,
    pub dropped: Action,
}

/// The SLR(1) ACTION/GOTO tables, one row per item-set state.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseTable {
    pub actions: Vec<IndexMap<String, Action>>,
    pub gotos: Vec<IndexMap<String, usize>>,
    pub conflicts: Vec<Conflict>,
    /// Set when a reduce/reduce collision was resolved by overwrite.
    pub conflicted: bool,
}

impl ParseTable {
    pub fn state_count(&self) -> usize {
        self.actions.len()
    }

    pub fn action(&self, state: usize, terminal: &str) -> Option<Action> {
        self.actions.get(state)?.get(terminal).copied()
    }

    pub fn goto(&self, state: usize, non_terminal: &str) -> Option<usize> {
        self.gotos.get(state)?.get(non_terminal).copied()
    }

    /// Build the SLR(1) table for `grammar`.
    pub fn build(grammar: &Grammar) -> ParseTable {
        Builder::new(grammar).build()
    }
}

struct Builder<'g> {
    grammar: &'g Grammar,
    states: Vec<BTreeSet<Item>>,
    transitions: Vec<IndexMap<String, usize>>,
    first: IndexMap<String, IndexSet<String>>,
    follow: IndexMap<String, IndexSet<String>>,
}

impl<'g> Builder<'g> {
    fn new(grammar: &'g Grammar) -> Self {
        Builder {
            grammar,
            states: Vec::new(),
            transitions: Vec::new(),
            first: IndexMap::new(),
            follow: IndexMap::new(),
        }
    }

    fn build(mut self) -> ParseTable {
        self.collect_states();
        self.compute_first();
        self.compute_follow();
        self.fill_table()
    }

    /// The symbol after the dot, if the dot is not at the end.
    fn next_symbol(&self, item: Item) -> Option<&str> {
        self.grammar.productions[item.production]
            .rhs
            .get(item.dot)
            .map(String::as_str)
    }

    /// Fixed-point closure: for every item `A -> α · B β` with `B` a
    /// non-terminal, add every `B -> · γ`.
    fn closure(&self, items: &BTreeSet<Item>) -> BTreeSet<Item> {
        let mut result = items.clone();
        let mut changed = true;
        while changed {
            changed = false;
            let snapshot: Vec<Item> = result.iter().copied().collect();
            for item in snapshot {
                let Some(next) = self.next_symbol(item) else {
                    continue;
                };
                if !self.grammar.is_non_terminal(next) {
                    continue;
                }
                for prod in self.grammar.productions_of(next) {
                    if result.insert(Item {
                        production: prod.id,
                        dot: 0,
                    }) {
                        changed = true;
                    }
                }
            }
        }
        result
    }

    /// Shift the dot across `symbol` in every matching item, then close.
    fn goto_set(&self, items: &BTreeSet<Item>, symbol: &str) -> BTreeSet<Item> {
        let moved: BTreeSet<Item> = items
            .iter()
            .filter(|item| self.next_symbol(**item) == Some(symbol))
            .map(|item| Item {
                production: item.production,
                dot: item.dot + 1,
            })
            .collect();
        if moved.is_empty() {
            moved
        } else {
            self.closure(&moved)
        }
    }

    /// BFS over item sets from the closure of `S -> · …`. Insertion order
    /// gives the state numbering; set equality deduplicates.
    fn collect_states(&mut self) {
        let mut initial = BTreeSet::new();
        initial.insert(Item {
            production: 0,
            dot: 0,
        });
        let initial = self.closure(&initial);

        let mut index: HashMap<BTreeSet<Item>, usize> = HashMap::new();
        index.insert(initial.clone(), 0);
        self.states.push(initial);
        self.transitions.push(IndexMap::new());

        let mut queue = std::collections::VecDeque::from([0usize]);
        while let Some(current) = queue.pop_front() {
            // Symbols with the dot in front, in deterministic order.
            let mut symbols = IndexSet::new();
            for item in &self.states[current] {
                if let Some(sym) = self.next_symbol(*item) {
                    symbols.insert(sym.to_string());
                }
            }

            for symbol in symbols {
                let target = self.goto_set(&self.states[current], &symbol);
                if target.is_empty() {
                    continue;
                }
                let next = match index.get(&target) {
                    Some(&existing) => existing,
                    None => {
                        let id = self.states.len();
                        index.insert(target.clone(), id);
                        self.states.push(target);
                        self.transitions.push(IndexMap::new());
                        queue.push_back(id);
                        id
                    }
                };
                self.transitions[current].insert(symbol, next);
            }
        }
    }

    /// FIRST sets by fixed point. `ε` membership is tracked with the
    /// [`EPSILON`] marker.
    fn compute_first(&mut self) {
        for t in &self.grammar.terminals {
            let mut set = IndexSet::new();
            set.insert(t.clone());
            self.first.insert(t.clone(), set);
        }
        for nt in &self.grammar.non_terminals {
            self.first.insert(nt.clone(), IndexSet::new());
        }

        let mut changed = true;
        while changed {
            changed = false;
            for prod in &self.grammar.productions {
                let mut addition = IndexSet::new();
                let mut all_nullable = true;
                for symbol in &prod.rhs {
                    let symbol_first = self.first.get(symbol).cloned().unwrap_or_default();
                    for s in &symbol_first {
                        if s != EPSILON {
                            addition.insert(s.clone());
                        }
                    }
                    if !symbol_first.contains(EPSILON) {
                        all_nullable = false;
                        break;
                    }
                }
                if all_nullable {
                    addition.insert(EPSILON.to_string());
                }
                if let Some(target) = self.first.get_mut(&prod.lhs) {
                    for s in addition {
                        if target.insert(s) {
                            changed = true;
                        }
                    }
                }
            }
        }
    }

    /// FIRST of a symbol string, with `ε` iff every symbol is nullable.
    fn first_of_seq(&self, symbols: &[String]) -> IndexSet<String> {
        let mut result = IndexSet::new();
        let mut all_nullable = true;
        for symbol in symbols {
            let symbol_first = self.first.get(symbol).cloned().unwrap_or_default();
            for s in &symbol_first {
                if s != EPSILON {
                    result.insert(s.clone());
                }
            }
            if !symbol_first.contains(EPSILON) {
                all_nullable = false;
                break;
            }
        }
        if all_nullable {
            result.insert(EPSILON.to_string());
        }
        result
    }

    /// FOLLOW sets by fixed point, seeded with `FOLLOW(start) = {EOF}`.
    fn compute_follow(&mut self) {
        for nt in &self.grammar.non_terminals {
            self.follow.insert(nt.clone(), IndexSet::new());
        }
        if let Some(start) = self.follow.get_mut(&self.grammar.start) {
            start.insert(EOF_SYMBOL.to_string());
        }

        let mut changed = true;
        while changed {
            changed = false;
            for prod in &self.grammar.productions {
                for (i, symbol) in prod.rhs.iter().enumerate() {
                    if !self.grammar.is_non_terminal(symbol) {
                        continue;
                    }
                    let trailer = self.first_of_seq(&prod.rhs[i + 1..]);
                    let mut addition: IndexSet<String> = trailer
                        .iter()
                        .filter(|s| *s != EPSILON)
                        .cloned()
                        .collect();
                    if trailer.contains(EPSILON) {
                        if let Some(lhs_follow) = self.follow.get(&prod.lhs) {
                            addition.extend(lhs_follow.iter().cloned());
                        }
                    }
                    if let Some(target) = self.follow.get_mut(symbol) {
                        for s in addition {
                            if target.insert(s) {
                                changed = true;
                            }
                        }
                    }
                }
            }
        }
    }

    fn fill_table(self) -> ParseTable {
        let mut actions: Vec<IndexMap<String, Action>> = vec![IndexMap::new(); self.states.len()];
        let mut gotos: Vec<IndexMap<String, usize>> = vec![IndexMap::new(); self.states.len()];
        let mut conflicts = Vec::new();
        let mut conflicted = false;

        for (state, item_set) in self.states.iter().enumerate() {
            // Shifts and gotos from the state's transitions.
            for (symbol, &target) in &self.transitions[state] {
                if self.grammar.is_terminal(symbol) {
                    actions[state].insert(symbol.clone(), Action::Shift(target));
                } else {
                    gotos[state].insert(symbol.clone(), target);
                }
            }

            // Reductions for items with the dot at the end.
            for item in item_set {
                let prod = &self.grammar.productions[item.production];
                if item.dot < prod.rhs.len() {
                    continue;
                }
                if prod.id == 0 {
                    // Accepting production reduces to ACCEPT on EOF.
                    if let Some(&existing) = actions[state].get(EOF_SYMBOL) {
                        conflicts.push(Conflict {
                            state,
                            symbol: EOF_SYMBOL.to_string(),
                            kind: ConflictKind::ReduceReduce,
                            kept: Action::Accept(prod.id),
                            dropped: existing,
                        });
                        conflicted = true;
                    }
                    actions[state].insert(EOF_SYMBOL.to_string(), Action::Accept(prod.id));
                    continue;
                }
                let follow = self
                    .follow
                    .get(&prod.lhs)
                    .cloned()
                    .unwrap_or_default();
                for terminal in &follow {
                    if !self.grammar.is_terminal(terminal) {
                        continue;
                    }
                    match actions[state].get(terminal).copied() {
                        Some(shift @ Action::Shift(_)) => {
                            // Shift always wins.
                            conflicts.push(Conflict {
                                state,
                                symbol: terminal.clone(),
                                kind: ConflictKind::ShiftReduce,
                                kept: shift,
                                dropped: Action::Reduce(prod.id),
                            });
                        }
                        Some(existing) => {
                            // Later reduction wins.
                            conflicts.push(Conflict {
                                state,
                                symbol: terminal.clone(),
                                kind: ConflictKind::ReduceReduce,
                                kept: Action::Reduce(prod.id),
                                dropped: existing,
                            });
                            conflicted = true;
                            actions[state].insert(terminal.clone(), Action::Reduce(prod.id));
                        }
                        None => {
                            actions[state].insert(terminal.clone(), Action::Reduce(prod.id));
                        }
                    }
                }
            }
        }

        ParseTable {
            actions,
            gotos,
            conflicts,
            conflicted,
        }
    }
}
