mod test_click_end_to_end;
mod test_joystick_end_to_end;
