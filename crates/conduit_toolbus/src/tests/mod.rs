mod tool_bus;
