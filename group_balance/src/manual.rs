/*!

This is the long-form manual for `group_balance` and `pricesurvey`.

## What the balancer does

A study enrolls participants into a fixed set of experimental groups
("premium", "base", "control" in the default configuration). Each group has
a hard capacity. When a new participant arrives, the balancer:

1. filters out the groups that are already at capacity;
2. finds the lowest count among the remaining groups;
3. picks uniformly at random among the groups tied for that count;
4. increments the chosen count in the registry.

With all groups full, the balancer reports the study as exhausted instead
of assigning. This is the expected end state of an enrollment, not an
error, and callers are expected to branch on it.

The greedy minimum-fill rule keeps the spread between the smallest and the
largest non-saturated group at one participant at most, so partial cohorts
stay comparable even if the study is interrupted.

## Registry ownership

The balancer does not persist anything. The registry of counts is passed
into and returned from every call; the caller loads it at the start of a
session and saves it immediately after each assignment. The increment must
be saved before the assignment is acted on, otherwise two sessions started
at nearly the same time could both observe stale minimum counts and
over-fill a group.

The `pricesurvey` binary offers two stores behind that contract:

* `"persistence": "file"` keeps the counts in a JSON document on disk, so
  capacity is enforced across program runs. A missing or corrupt document
  falls back to an all-zero registry. Note that concurrent sessions from
  separate processes are only balanced best-effort: there is no
  cross-process lock around the load/assign/save cycle.
* `"persistence": "session"` keeps the counts in memory for the duration
  of one process, matching deployments where an external system owns the
  durable counts.

## Tie-break modes

Ties are always resolved uniformly at random. The `Seeded` mode drives the
selection from a fixed seed so that a run can be reproduced exactly; the
`Uniform` mode seeds from OS entropy. A deterministic tie-break (always
the first group in declaration order) would systematically favor early
groups when cohorts enroll in parallel and is deliberately not offered.

 */
