mod test_forwarding;
