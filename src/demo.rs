//! Built-in demo inputs for `--demo`

pub const DEMO_CALENDAR: &str = "MONDAY
09:00 AM - 10:00 AM: Weekly Team Sync
13:00 PM - 14:00 PM: Deep Work Block

TUESDAY
10:00 AM - 11:00 AM: Client Introduction Call
14:00 PM - 15:00 PM: Project Review

WEDNESDAY
09:00 AM - 12:00 PM: Coding Sprint (Do not disturb)
15:00 PM - 15:30 PM: 1:1 with Manager

THURSDAY
11:00 AM - 12:00 PM: All Hands Meeting";

pub const DEMO_PREFERENCES: &str = "I need to schedule a 30-minute sync with the design team.
Avoid Tuesday mornings.
Wednesday afternoon is best.
Ensure it doesn't overlap with existing meetings.";
